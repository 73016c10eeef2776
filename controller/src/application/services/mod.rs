//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod availability_cache;
pub mod package_builder;
pub mod reconciler;
pub mod record_locks;
pub mod registry;

pub use availability_cache::AvailabilityCache;
pub use package_builder::PackageBuilder;
pub use reconciler::{ReconcileReport, Reconciler};
pub use record_locks::RecordLocks;
pub use registry::RegistryService;
