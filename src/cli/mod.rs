//! Command-line interface for scaffold-cli.
//!
//! # Commands
//!
//! - `introspect <template>` - Required/optional variables, blocks, metadata and warnings
//! - `validate <template> [--content <file>]` - Evaluate metadata rules; exits 1 when blocking
//! - `chain <template>` - Print the inheritance chain, root first
//! - `list [--check]` - List templates in the templates directory, optionally introspecting each
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config <path>`: configuration file (overrides `SCAFFOLD_CONFIG` and `./scaffold.toml`)
//! - `--templates-dir <dir>`: overrides `[templates] dir`
//! - `--format text|json`: output format
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success, no blocking validation failures |
//! | 1 | Validation produced a BLOCKING failure |
//! | 2 | The command failed (missing template, parse error, bad config, ...) |

mod chain;
mod common;
mod introspect;
mod list;
mod output;
mod validate;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use common::CommandContext;

/// Output format shared by every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Validation found a BLOCKING failure.
    Blocked,
}

impl CommandOutcome {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Blocked => 1,
        }
    }
}

/// Exit code used when a command fails outright.
pub const ERROR_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "scaffold",
    about = "Inheritance-aware introspection and validation for scaffolding templates",
    version,
    long_about = "scaffold resolves a template's extends chain and reports the variables it needs, \
                  the blocks it defines and overrides, and whether generated content satisfies \
                  the rules declared in the chain's metadata."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to scaffold.toml
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory containing templates
    #[arg(long, global = true, value_name = "DIR")]
    templates_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Show variables, blocks, metadata and warnings for a template
    Introspect(introspect::IntrospectCommand),

    /// Evaluate a template's rules, optionally against generated content
    Validate(validate::ValidateCommand),

    /// Print a template's inheritance chain
    Chain(chain::ChainCommand),

    /// List available templates
    List(list::ListCommand),
}

impl Cli {
    /// Log filter directive implied by the global flags, if any.
    ///
    /// `None` means `RUST_LOG` (or the default) decides.
    #[must_use]
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<CommandOutcome> {
        let ctx = CommandContext::load(self.config, self.templates_dir).await?;
        let format = self.format;

        match self.command {
            Commands::Introspect(cmd) => cmd.execute(&ctx, format).await,
            Commands::Validate(cmd) => cmd.execute(&ctx, format).await,
            Commands::Chain(cmd) => cmd.execute(&ctx, format).await,
            Commands::List(cmd) => cmd.execute(&ctx, format).await,
        }
    }
}
