//! scaffold-cli - inheritance-aware template introspection and validation
//!
//! Scaffolding systems compose generated artifacts from hierarchies of
//! Jinja-style templates: a universal base, a format base, a language base
//! and a specialization, each `extends`-ing the one above it. Before anything
//! is rendered, scaffold-cli answers the questions a generator needs:
//!
//! - Which variables must the caller supply, and which have fallbacks?
//! - Which tier introduced each variable and each block?
//! - Which blocks does a tier override, and are any of its blocks dead?
//! - What rules does the chain declare, and does generated content satisfy them?
//!
//! Nothing is ever rendered. Templates are parsed into a structural record
//! (extends target, block definitions, variable reads, local assignments) and
//! analyzed across the resolved chain.
//!
//! # Pipeline
//!
//! ```text
//! TemplateSource ──► ChainResolver ──► InheritanceChain
//!                        │                  │
//!                   ParseCache      ┌───────┼────────────┐
//!                                   ▼       ▼            ▼
//!                              variables  blocks     metadata
//!                                   └───────┼────────────┘
//!                                           ▼
//!                                       validation ──► ValidationReport
//! ```
//!
//! # Modules
//!
//! ## Analysis
//! - [`templating`] - Lexer, expression scanner and parser producing [`templating::ParsedTemplate`]
//! - [`chain`] - Extends-chain resolution with cycle/depth detection, cancellation and a parse cache
//! - [`variables`] - Required/optional classification with provenance
//! - [`blocks`] - Block override index and dead-block warnings
//! - [`metadata`] - Embedded `scaffold:metadata` blocks merged along the chain
//! - [`validation`] - Rule evaluation producing a [`validation::ValidationReport`]
//!
//! ## Facade and sources
//! - [`inspector`] - Request facade owning the caches
//! - [`source`] - [`source::TemplateSource`] trait with in-memory and directory providers
//!
//! ## Supporting modules
//! - [`cli`] - The `scaffold` command-line interface
//! - [`config`] - `scaffold.toml` loading
//! - [`constants`] - Defaults and markers
//! - [`core`] - [`core::ScaffoldError`] and user-facing error formatting
//! - [`utils`] - Ordered maps, template names and content identity
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_cli::inspector::Inspector;
//! use scaffold_cli::source::DirectorySource;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let inspector = Inspector::new(DirectorySource::new("templates"));
//! let report = inspector.introspect("python/component").await?;
//! for name in &report.required_variables {
//!     println!("required: {name}");
//! }
//!
//! let content = std::fs::read_to_string("src/component.py")?;
//! let validation = inspector.validate("python/component", Some(&content)).await?;
//! if validation.blocking {
//!     std::process::exit(1);
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocks;
pub mod chain;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod inspector;
pub mod metadata;
pub mod source;
pub mod templating;
pub mod utils;
pub mod validation;
pub mod variables;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
