//! Standalone MCP server binary for Reelgen.
//!
//! Communicates with AI clients over stdio JSON-RPC and drives video
//! generation against the configured backend.

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reelgen::backend::{BackendClient, VideoBackend};
use reelgen::jobs::scheduler::TokioScheduler;
use reelgen::mcp::ReelgenMcp;
use reelgen::session::GeneratorSession;
use reelgen::settings::{resolve_data_dir, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so stdout stays clean for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let settings = Settings::load(&data_dir);
    let api_base = settings.api_base();
    info!(api_base = %api_base, max_wait_secs = settings.max_wait_secs, "loaded settings");

    let backend: Arc<dyn VideoBackend> =
        Arc::new(BackendClient::new(api_base, settings.request_timeout())?);

    let session = GeneratorSession::new(backend, Arc::new(TokioScheduler), settings.poll_policy());
    session.start().await;

    let server = ReelgenMcp::new(Arc::new(session));

    info!("Reelgen MCP server starting on stdio");

    let service = server
        .serve(stdio())
        .await
        .context("MCP server failed to start")?;

    service.waiting().await?;

    Ok(())
}
