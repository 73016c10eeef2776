//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! Registry and config errors convert to `anyhow::Error` via the `?` operator;
//! `BuildError` is returned directly by the package builder.

use fleet_common::AgentId;
use thiserror::Error;

// ── Agent errors ──────────────────────────────────────────────────────────────

/// Errors related to agent registration and lookup.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent {0} not found.")]
    NotFound(AgentId),

    #[error("Invalid agent record:\n{0}")]
    Invalid(String),
}

// ── Access errors ─────────────────────────────────────────────────────────────

/// Errors raised when a user asks for agents they are not entitled to.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("User '{0}' has no agent access configured.")]
    UnknownUser(String),

    #[error("User '{user}' may not use agents in region '{region}'.")]
    Denied { user: String, region: String },
}

// ── Package build errors ──────────────────────────────────────────────────────

/// Errors aborting an agent package build. No partial artifact is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Required {kind} artifact missing (expected a file named '{prefix}*').")]
    MissingArtifact { kind: &'static str, prefix: String },

    #[error("Package payload of {required} bytes exceeds the {bound}-byte bound ({what}).")]
    BoundExceeded {
        what: &'static str,
        required: u64,
        bound: u64,
    },

    #[error("Invalid package version '{0}': must be a semantic version such as 1.2.3")]
    InvalidVersion(String),

    #[error("Invalid push target '{0}': host must be non-empty and port non-zero")]
    InvalidTarget(String),

    #[error("Invalid package region '{0}'")]
    InvalidRegion(String),

    #[error("Invalid package owner {0:?}: letters, digits and . _ @ + - only")]
    InvalidOwner(String),

    #[error("Artifact name {0:?} must use only letters, digits and . _ -")]
    InvalidArtifactName(String),

    #[error("Cannot read artifact {path}: {reason}")]
    Source { path: String, reason: String },

    #[error("Cannot assemble package archive: {0}")]
    Archive(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
