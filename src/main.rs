use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use askwiki::api::{AppState, create_router};
use askwiki::config::Config;
use askwiki::generator::ChatCompletionGenerator;
use askwiki::retriever::WikiRetriever;

/// Answers questions about the internal documentation over HTTP.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on, overrides BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    /// Dotenv file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    tracing::debug!(?config, "configuration loaded");

    let retriever = WikiRetriever::new(&config.docs, config.http_timeout)
        .context("failed to build documentation client")?;
    let generator = ChatCompletionGenerator::new(&config.completion, config.http_timeout)
        .context("failed to build completion client")?;

    let state = Arc::new(AppState::new(Arc::new(retriever), Arc::new(generator)));
    let app = create_router(state);

    let bind_addr = args.bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
