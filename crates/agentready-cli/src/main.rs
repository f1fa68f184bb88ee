use agentready_cli::Cli;
use agentready_core::CancellationToken;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let input = cli.input()?;
    let engine = cli.build_engine()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling assessment");
            on_interrupt.cancel();
        }
    });

    info!(url = %input.url, input_type = %input.input_type, "starting assessment");
    let result = engine
        .assess_with_cancel(&input, &cancel)
        .await
        .with_context(|| format!("assessment of {} failed", input.url))?;

    print!("{}", cli.render(&result)?);
    if cli.json || cli.legacy {
        println!();
    }
    Ok(())
}
