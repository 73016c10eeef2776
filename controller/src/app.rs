//! Application context — unified state passed to every command handler.
//!
//! `AppContext` resolves the config once, wires the registry and package
//! builder to their production adapters, and carries the output flags.

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::application::services::{PackageBuilder, Reconciler, RegistryService};
use crate::domain::ControllerConfig;
use crate::infra::{JsonFileStore, LocalFs, StaticAuthorization, TcpLivenessProbe, YamlConfigStore};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Registry wired to the production adapters.
pub type Registry = RegistryService<JsonFileStore, StaticAuthorization, TcpLivenessProbe>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `FLEET_YES` env vars).
    pub yes: bool,
    /// Explicit config file path.
    pub config: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Validated controller configuration.
    pub config: ControllerConfig,
    /// The agent registry.
    pub registry: Registry,
    /// Agent package builder.
    pub packager: PackageBuilder,
    /// Local filesystem access.
    pub fs: LocalFs,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `FLEET_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded or validated, or if
    /// no store path is configured and the home directory is unknown.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("FLEET_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore::resolve(flags.behaviour.config.as_deref())?;
        let config = config_store.load()?;
        debug!(path = %config_store.path().display(), region = %config.region, "config loaded");

        let store = match &config.store.path {
            Some(path) => JsonFileStore::with_path(path.clone()),
            None => JsonFileStore::new()?,
        };
        let authorization = StaticAuthorization::new(config.access.clone());
        let probe = TcpLivenessProbe::new(config.reconcile.probe_timeout());
        let reconciler = Reconciler::new(probe, &config.reconcile);
        let registry = RegistryService::new(store, authorization, reconciler);
        let packager = PackageBuilder::new(config.package.clone());

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config,
            registry,
            packager,
            fs: LocalFs,
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `FLEET_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
