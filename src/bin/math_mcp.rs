use anyhow::Result;
use clap::Parser;
use oss_agent::logging::{LogTarget, init_logging};
use oss_agent::mcp::server::run_stdio;

#[derive(Parser, Debug)]
#[command(
    name = "math-mcp",
    version,
    about = "MCP server exposing integer arithmetic tools and math prompts over stdio"
)]
struct Cli {
    /// Log level; logs always go to stderr (env OSS_AGENT_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = cli
        .log_level
        .or_else(|| std::env::var("OSS_AGENT_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level, LogTarget::Stderr)?;
    run_stdio().await
}
