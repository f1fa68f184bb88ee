use std::path::PathBuf;

use agentready_core::EngineConfig;
use agentready_core::plugins::{PluginSettings, default_engine, llm};
use agentready_server::{AppState, router};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "agentready-server", version, about = "Serve agentready assessments over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "AGENTREADY_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// TOML engine configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    #[arg(long, env = "AGENTREADY_LLM_BASE_URL", default_value = llm::DEFAULT_BASE_URL)]
    llm_base_url: String,

    #[arg(long, env = "AGENTREADY_LLM_MODEL", default_value = llm::DEFAULT_MODEL)]
    llm_model: String,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let settings = PluginSettings {
        github_token: args.github_token,
        llm_api_key: args.llm_api_key,
        llm_base_url: args.llm_base_url,
        llm_model: args.llm_model,
        ..Default::default()
    };
    let engine = default_engine(config, &settings).context("failed to set up the assessment engine")?;

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(address = %args.listen, "agentready server listening");

    axum::serve(listener, router(AppState::new(engine)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
