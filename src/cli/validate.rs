//! `scaffold validate`.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use super::common::{CommandContext, emit};
use super::{CommandOutcome, OutputFormat, output};

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Leaf template name
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Generated file to check content rules against; `-` reads stdin
    #[arg(long, value_name = "FILE")]
    pub content: Option<PathBuf>,
}

impl ValidateCommand {
    pub async fn execute(self, ctx: &CommandContext, format: OutputFormat) -> Result<CommandOutcome> {
        let content = match &self.content {
            Some(path) if path.as_os_str() == "-" => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .context("Failed to read content from stdin")?;
                Some(text)
            }
            Some(path) => Some(
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read content from {}", path.display()))?,
            ),
            None => None,
        };

        let report = ctx.inspector().validate(&self.template, content.as_deref()).await?;
        emit(format, &report, || output::validation(&report))?;

        Ok(if report.blocking {
            CommandOutcome::Blocked
        } else {
            CommandOutcome::Success
        })
    }
}
