use anyhow::Result;
use clap::Parser;
use scaffold_cli::cli::{self, ERROR_EXIT_CODE};
use scaffold_cli::core::user_friendly_error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(level: Option<&str>) {
    // Flags win over RUST_LOG; warnings by default
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.log_level());

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(outcome) => {
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(ERROR_EXIT_CODE);
        }
    }
}
