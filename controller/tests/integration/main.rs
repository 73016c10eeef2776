//! Integration tests for fleetctl
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! They are slower and should be run separately from unit tests.

mod cli_tests;
mod package_command;
mod quota_command;
