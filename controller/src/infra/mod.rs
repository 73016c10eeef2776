//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the JSON record store, TCP
//! liveness probes, filesystem artifact access and config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod authorization;
pub mod config;
pub mod fs;
pub mod network;
pub mod store;

pub use authorization::StaticAuthorization;
pub use config::YamlConfigStore;
pub use fs::LocalFs;
pub use network::TcpLivenessProbe;
pub use store::JsonFileStore;
