//! Unit tests for the fleet controller
//!
//! These tests use in-memory fakes and run fast without external I/O.

mod architecture;
mod availability_cache;
mod mocks;
