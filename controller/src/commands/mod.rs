//! Command implementations

pub mod agents;
pub mod package;
pub mod quota;
pub mod reconcile;
pub mod version;
