//! `scaffold chain`.

use anyhow::Result;
use clap::Args;

use super::common::{CommandContext, emit};
use super::{CommandOutcome, OutputFormat, output};

#[derive(Args, Debug)]
pub struct ChainCommand {
    /// Leaf template name
    #[arg(value_name = "TEMPLATE")]
    pub template: String,
}

impl ChainCommand {
    pub async fn execute(self, ctx: &CommandContext, format: OutputFormat) -> Result<CommandOutcome> {
        let chain = ctx.inspector().resolve(&self.template).await?;
        let entries = chain.summary();
        emit(format, &entries, || output::chain(&entries))?;
        Ok(CommandOutcome::Success)
    }
}
