use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use oss_agent::agent::Agent;
use oss_agent::cli::{self, InteractiveSession};
use oss_agent::config::{AppConfig, CliOverrides, ReasoningEffort, parse_bool_flag};
use oss_agent::logging::{LogTarget, init_logging};
use oss_agent::render::StreamRenderer;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "oss-agent",
    version,
    about = "Terminal chat agent for gpt-oss models on OpenAI-compatible endpoints"
)]
struct Cli {
    /// Model id (env STRANDS_MODEL_ID)
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible API base URL (env STRANDS_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    temperature: Option<f32>,

    /// true/false; anything other than true, 1 or yes disables streaming
    #[arg(long, value_name = "BOOL")]
    streaming: Option<String>,

    /// true/false
    #[arg(long, value_name = "BOOL")]
    show_reasoning: Option<String>,

    /// low, medium or high
    #[arg(long)]
    reasoning_effort: Option<ReasoningEffort>,

    #[arg(long)]
    system_prompt: Option<String>,

    /// Log level or filter directive (error,warn,info,debug,trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Skip loading .env
    #[arg(long, action = ArgAction::SetTrue)]
    no_dotenv: bool,

    /// Run a single query and exit; without it an interactive session starts
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            model_id: self.model.clone(),
            base_url: self.base_url.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            streaming: self.streaming.as_deref().map(parse_bool_flag),
            show_reasoning: self.show_reasoning.as_deref().map(parse_bool_flag),
            reasoning_effort: self.reasoning_effort,
            system_prompt: self.system_prompt.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = AppConfig::load(cli.overrides())?;
    let target = match cli.log_file.clone() {
        Some(path) => LogTarget::File(path),
        None => LogTarget::Stderr,
    };
    init_logging(&cfg.log_level, target)?;
    debug!(model = %cfg.model_id, base_url = %cfg.base_url, "app config");

    let mut stdout = io::stdout();
    cli::write_config_banner(&mut stdout, &cfg)?;

    let mut agent = Agent::from_config(&cfg)?;
    let renderer = StreamRenderer::new(cfg.show_reasoning);
    let interrupt = CancellationToken::new();
    let watcher = cli::spawn_interrupt_watcher(interrupt.clone());

    let result = if cli.query.is_empty() {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        let mut session = InteractiveSession::new(input, stdout, renderer, interrupt);
        session.run(&mut agent).await.map(|end| {
            info!(?end, "session ended");
        })
    } else {
        let query = cli.query.join(" ");
        cli::run_batch(&mut agent, renderer, &query, &mut stdout, &interrupt)
            .await
            .map(|outcome| info!(?outcome, "batch query finished"))
    };
    watcher.abort();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if !cli.no_dotenv {
        dotenv().ok();
    }

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:?}");
            1
        }
    };
    let _ = io::stdout().flush();
    // A pending stdin read lives on a blocking thread that runtime shutdown
    // would wait for.
    std::process::exit(code);
}
