//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layering between
//! domain, application, infra and presentation code is maintained.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based line numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            let comment = trimmed.starts_with("//") || trimmed.starts_with("/*");
            (!in_test && !comment).then(|| (i + 1, line.to_string()))
        })
        .collect()
}

fn src(parts: &[&str]) -> PathBuf {
    let mut dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    for part in parts {
        dir = dir.join(part);
    }
    dir
}

/// Every production line under `dir` containing one of `forbidden`.
fn violations(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (lineno, line) in production_lines(&file) {
            for needle in forbidden {
                if line.contains(needle) {
                    found.push(format!("{rel}:{lineno}: `{needle}`: {}", line.trim()));
                }
            }
        }
    }
    found
}

// ── Layer boundaries ──────────────────────────────────────────────────────────

#[test]
fn domain_is_pure() {
    let found = violations(
        &src(&["domain"]),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::net",
            "std::process",
        ],
    );
    assert!(found.is_empty(), "domain/ must stay pure:\n{}", found.join("\n"));
}

#[test]
fn application_does_not_import_infra_or_presentation() {
    let found = violations(
        &src(&["application"]),
        &["crate::infra", "crate::commands", "crate::output", "std::fs"],
    );
    assert!(
        found.is_empty(),
        "application/ may only use domain and ports:\n{}",
        found.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let found = violations(&src(&["infra"]), &["crate::commands", "crate::output"]);
    assert!(
        found.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        found.join("\n")
    );
}

#[test]
fn infra_and_services_do_not_print() {
    let mut found = violations(&src(&["infra"]), &["println!", "eprintln!"]);
    found.extend(violations(&src(&["application"]), &["println!", "eprintln!"]));
    assert!(
        found.is_empty(),
        "infra/ and application/ report through tracing or ProgressReporter:\n{}",
        found.join("\n")
    );
}

// ── Presentation ──────────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut found = violations(&src(&["commands"]), &["json: bool", "serde_json::"]);
    for file in collect_rs_files(&src(&["commands"])) {
        for (lineno, line) in production_lines(&file) {
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                found.push(format!("{}:{lineno}: inline JSON branch", file.display()));
            }
        }
    }
    assert!(
        found.is_empty(),
        "Found inline JSON handling in commands/, use app.renderer() instead:\n{}",
        found.join("\n")
    );
}

#[test]
fn only_the_registry_touches_the_store() {
    let mut found = violations(&src(&["commands"]), &["JsonFileStore", "AgentStore"]);
    found.extend(violations(&src(&["output"]), &["JsonFileStore", "AgentStore"]));
    assert!(
        found.is_empty(),
        "store access must go through RegistryService:\n{}",
        found.join("\n")
    );
}
