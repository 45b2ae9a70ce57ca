//! Core types for scaffold-cli
//!
//! This module holds the error vocabulary shared by every analysis stage.
//!
//! ## `error` - Error Handling
//!
//! - [`ScaffoldError`] - Enumerated failure modes of parsing, resolution and
//!   metadata collection
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! # Error Handling Pattern
//!
//! ```rust,no_run
//! use scaffold_cli::core::{ScaffoldError, user_friendly_error};
//!
//! fn lookup() -> anyhow::Result<()> {
//!     Err(ScaffoldError::TemplateNotFound {
//!         name: "python/component".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = lookup() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, ScaffoldError, user_friendly_error};
