//! Integration test suite for scaffold-cli
//!
//! End-to-end tests of the analysis pipeline and the `scaffold` binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: The layered chain and the rule/warning scenarios
//! - **determinism**: Byte-identical sources give byte-identical reports
//! - **concurrency**: Shared parse cache under concurrent requests, cancellation
//! - **error_scenarios**: Fatal errors surfaced through the facade
//! - **directory**: The directory-backed source
//! - **cli**: The `scaffold` binary

mod cli;
mod concurrency;
mod determinism;
mod directory;
mod error_scenarios;
mod scenarios;
