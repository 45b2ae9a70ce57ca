//! `scaffold introspect`.

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, emit};
use super::{CommandOutcome, OutputFormat, output};

#[derive(Args, Debug)]
pub struct IntrospectCommand {
    /// Leaf template name, relative to the templates directory
    #[arg(value_name = "TEMPLATE")]
    pub template: String,
}

impl IntrospectCommand {
    pub async fn execute(self, ctx: &CommandContext, format: OutputFormat) -> Result<CommandOutcome> {
        let report = ctx.inspector().introspect(&self.template).await?;
        emit(format, report.as_ref(), || output::introspection(&report))?;
        Ok(CommandOutcome::Success)
    }
}
