use crate::mcp::service::MathMcpService;
use anyhow::{Context, Result};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;

/// Serves the math tools over stdin/stdout until the client disconnects.
pub async fn run_stdio() -> Result<()> {
    info!("Starting MCP Server...");
    let service = MathMcpService::new()
        .serve(stdio())
        .await
        .context("start MCP stdio service")?;
    let reason = service.waiting().await.context("MCP service task failed")?;
    info!(?reason, "MCP server stopped");
    Ok(())
}
