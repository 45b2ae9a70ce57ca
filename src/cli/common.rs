//! State shared by every command.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::ScaffoldConfig;
use crate::inspector::Inspector;
use crate::source::DirectorySource;

/// Effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: ScaffoldConfig,
    pub templates_dir: PathBuf,
}

impl CommandContext {
    /// Load configuration and apply command-line overrides.
    pub async fn load(config_path: Option<PathBuf>, templates_dir: Option<PathBuf>) -> Result<Self> {
        let config = ScaffoldConfig::load(config_path).await?;
        let cwd = std::env::current_dir().context("Failed to determine the working directory")?;

        let templates_dir = match templates_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => cwd.join(dir),
            None => config.templates_dir(&cwd),
        };
        tracing::debug!(templates_dir = %templates_dir.display(), "using templates directory");

        Ok(Self {
            config,
            templates_dir,
        })
    }

    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.templates_dir).with_extensions(self.config.extensions())
    }

    pub fn inspector(&self) -> Inspector<DirectorySource> {
        Inspector::new(self.source()).with_max_depth(self.config.resolution.max_depth)
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Print either the JSON form of `value` or its text rendering.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Text => {
            print!("{}", text());
            Ok(())
        }
    }
}
