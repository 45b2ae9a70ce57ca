//! `scaffold list`.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::common::{CommandContext, emit};
use super::{CommandOutcome, OutputFormat, output};

#[derive(Args, Debug)]
pub struct ListCommand {
    /// Introspect every template and report its status
    #[arg(long)]
    pub check: bool,
}

/// Status of one template under `list --check`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateStatus {
    pub template: String,
    pub chain_length: Option<usize>,
    pub warnings: usize,
    pub error: Option<String>,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext, format: OutputFormat) -> Result<CommandOutcome> {
        let source = ctx.source();
        let names = source.list_templates().await.with_context(|| {
            format!("Failed to list templates in {}", ctx.templates_dir.display())
        })?;

        if !self.check {
            emit(format, &names, || output::list(&names))?;
            return Ok(CommandOutcome::Success);
        }

        let inspector = ctx.inspector();
        let statuses: Vec<TemplateStatus> = names
            .iter()
            .zip(inspector.introspect_many(&names).await)
            .map(|(name, result)| match result {
                Ok(report) => TemplateStatus {
                    template: name.clone(),
                    chain_length: Some(report.chain.len()),
                    warnings: report.warnings.len(),
                    error: None,
                },
                Err(err) => TemplateStatus {
                    template: name.clone(),
                    chain_length: None,
                    warnings: 0,
                    error: Some(err.to_string()),
                },
            })
            .collect();

        emit(format, &statuses, || output::statuses(&statuses))?;
        Ok(CommandOutcome::Success)
    }
}
