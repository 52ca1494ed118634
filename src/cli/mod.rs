//! Terminal front end: config banner, one-shot queries and the interactive loop.

use crate::agent::AgentRuntime;
use crate::config::AppConfig;
use crate::render::{RenderOutcome, StreamRenderer, WriterSink};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const RULE_WIDTH: usize = 60;
pub const FAREWELL: &str = "👋 Goodbye!";
pub const PROMPT: &str = "\n> ";
const EXIT_COMMANDS: [&str; 4] = ["exit", "quit", "/quit", "bye"];

pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_COMMANDS.iter().any(|c| input.eq_ignore_ascii_case(c))
}

pub fn write_config_banner<W: Write>(out: &mut W, cfg: &AppConfig) -> std::io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "🤖 Model: {}", cfg.model_id)?;
    writeln!(
        out,
        "🎛️ Max tokens: {}, 🌡️ Temperature: {}, 🌊 Streaming: {}",
        cfg.max_tokens, cfg.temperature, cfg.streaming
    )?;
    writeln!(
        out,
        "🧠 Show reasoning: {}, 💭 Reasoning effort: {}",
        cfg.show_reasoning, cfg.reasoning_effort
    )?;
    writeln!(out, "{rule}")?;
    out.flush()
}

/// Cancels `token` on the first Ctrl-C.
pub fn spawn_interrupt_watcher(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            token.cancel();
        }
    })
}

/// Streams one query from the agent through the renderer into `out`.
pub async fn run_query<A, W>(
    agent: &mut A,
    renderer: StreamRenderer,
    query: &str,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<RenderOutcome>
where
    A: AgentRuntime + ?Sized,
    W: Write,
{
    debug!(query_len = query.len(), "running query");
    let events = agent.stream_async(query);
    let mut sink = WriterSink::new(out);
    renderer
        .render(events, &mut sink, cancel)
        .await
        .context("agent query failed")
}

/// Batch mode: one query, then return. An interrupt stops rendering early.
pub async fn run_batch<A, W>(
    agent: &mut A,
    renderer: StreamRenderer,
    query: &str,
    out: &mut W,
    interrupt: &CancellationToken,
) -> Result<RenderOutcome>
where
    A: AgentRuntime + ?Sized,
    W: Write,
{
    let outcome = run_query(agent, renderer, query, out, interrupt).await?;
    if let RenderOutcome::Cancelled { .. } = outcome {
        writeln!(out)?;
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ExitCommand,
    EndOfInput,
    Interrupted,
}

pub struct InteractiveSession<R, W> {
    input: R,
    out: W,
    renderer: StreamRenderer,
    interrupt: CancellationToken,
}

impl<R, W> InteractiveSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, renderer: StreamRenderer, interrupt: CancellationToken) -> Self {
        Self {
            input,
            out,
            renderer,
            interrupt,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Reads queries until an exit word, end of input or an interrupt.
    /// Prints the farewell exactly once on every path that returns `Ok`.
    pub async fn run<A: AgentRuntime + ?Sized>(&mut self, agent: &mut A) -> Result<SessionEnd> {
        writeln!(self.out, "\n🧬 OSS Agent 🧬 - Interactive Mode")?;
        writeln!(self.out, "Type 'exit' or 'quit' to end.")?;

        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let mut line = String::new();
            let read = tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => None,
                n = self.input.read_line(&mut line) => Some(n.context("read user input")?),
            };
            let end = match read {
                None => Some(SessionEnd::Interrupted),
                Some(0) => Some(SessionEnd::EndOfInput),
                Some(_) => None,
            };
            if let Some(end) = end {
                writeln!(self.out, "\n{FAREWELL}")?;
                self.out.flush()?;
                info!(?end, "interactive session finished");
                return Ok(end);
            }

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit_command(query) {
                writeln!(self.out, "{FAREWELL}")?;
                self.out.flush()?;
                info!("interactive session finished by exit command");
                return Ok(SessionEnd::ExitCommand);
            }

            let outcome =
                run_query(agent, self.renderer, query, &mut self.out, &self.interrupt).await?;
            if let RenderOutcome::Cancelled { .. } = outcome {
                writeln!(self.out, "\n{FAREWELL}")?;
                self.out.flush()?;
                info!("interactive session interrupted during a query");
                return Ok(SessionEnd::Interrupted);
            }
            writeln!(self.out, "\n")?;
        }
    }
}

#[cfg(test)]
mod tests;
