//! Agent runtime: runs model turns, executes tools, and emits raw events.

pub mod events;

use crate::config::{AppConfig, ReasoningEffort};
use crate::llm::types::{AssistantTurn, ChatMessage, ChatRequest, ToolCall, Usage};
use crate::llm::{OpenAIClient, StreamDelta, ToolDeltaBuffer};
use crate::tools::{ToolRegistry, result_text};
use anyhow::{Result, anyhow};
use events::{ToolOutcome, ToolStatus};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 32;

pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<Value>> + Send + 'a>>;

/// Anything that turns a query into a stream of raw interaction events.
pub trait AgentRuntime: Send {
    fn stream_async<'a>(&'a mut self, query: &str) -> EventStream<'a>;
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub streaming: bool,
    pub reasoning_effort: ReasoningEffort,
    pub system_prompt: String,
    pub max_iterations: usize,
}

impl AgentSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            model_id: cfg.model_id.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            streaming: cfg.streaming,
            reasoning_effort: cfg.reasoning_effort,
            system_prompt: cfg.system_prompt.clone(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

pub struct Agent {
    client: OpenAIClient,
    settings: AgentSettings,
    tools: ToolRegistry,
    messages: Vec<ChatMessage>,
}

impl Agent {
    pub fn new(client: OpenAIClient, settings: AgentSettings, tools: ToolRegistry) -> Self {
        let messages = vec![ChatMessage::system(settings.system_prompt.clone())];
        Self {
            client,
            settings,
            tools,
            messages,
        }
    }

    /// Builds the client and default tool set from resolved configuration.
    /// A missing API key is reported by the first query, not here.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let api_key = cfg.api_key.clone().unwrap_or_default();
        if api_key.trim().is_empty() {
            warn!("no API key configured; queries will fail until one is set");
        }
        let client = OpenAIClient::new(cfg.base_url.clone(), api_key)?.with_llm_config(cfg.llm.clone());
        let tools = ToolRegistry::with_defaults(cfg.project_root.clone())?;
        Ok(Self::new(client, AgentSettings::from_config(cfg), tools))
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn tokens_used(&self) -> u32 {
        self.client.get_tokens_used()
    }

    fn request(&self) -> ChatRequest {
        ChatRequest {
            model: self.settings.model_id.clone(),
            messages: self.messages.clone(),
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(self.settings.temperature),
            stream: Some(self.settings.streaming),
            tools: if self.tools.is_empty() {
                None
            } else {
                Some(self.tools.defs())
            },
            reasoning_effort: Some(self.settings.reasoning_effort.as_str().to_string()),
            stream_options: None,
        }
    }

    async fn run_tool(&self, call: &ToolCall) -> ToolOutcome {
        let tool_use_id = call.id.clone().unwrap_or_default();
        match self.tools.dispatch_call(call).await {
            Ok(value) => {
                debug!(tool = %call.function.name, "tool call succeeded");
                ToolOutcome {
                    tool_use_id,
                    status: ToolStatus::Success,
                    text: result_text(&value),
                }
            }
            Err(e) => {
                warn!(tool = %call.function.name, err = %e, "tool call failed");
                ToolOutcome {
                    tool_use_id,
                    status: ToolStatus::Error,
                    text: format!("Error: {e:#}"),
                }
            }
        }
    }
}

const NO_API_KEY: &str = "no API key configured: set AWS_BEARER_TOKEN_BEDROCK or OPENAI_API_KEY";

fn new_tool_use_id() -> String {
    format!("tooluse_{}", uuid::Uuid::new_v4().simple())
}

fn accumulate(total: &mut Option<Usage>, usage: Option<Usage>) {
    if let Some(u) = usage {
        let t = total.get_or_insert_with(Usage::default);
        t.prompt_tokens += u.prompt_tokens;
        t.completion_tokens += u.completion_tokens;
        t.total_tokens += u.total_tokens;
    }
}

impl AgentRuntime for Agent {
    fn stream_async<'a>(&'a mut self, query: &str) -> EventStream<'a> {
        let query = query.to_string();
        // Dropping the stream drops the in-flight request; no separate
        // cancellation is needed here.
        let cancel = CancellationToken::new();

        Box::pin(async_stream::try_stream! {
            if !self.client.has_api_key() {
                Err(anyhow!("{NO_API_KEY}"))?;
            }
            self.messages.push(ChatMessage::user(query));
            yield events::init_event_loop();

            let mut usage_total: Option<Usage> = None;
            let mut iterations = 0usize;
            loop {
                iterations += 1;
                if iterations > self.settings.max_iterations {
                    warn!(iterations, "max tool iterations reached");
                    Err(anyhow!("max tool iterations reached ({})", self.settings.max_iterations))?;
                }
                debug!(iteration = iterations, messages = self.messages.len(), "agent loop iteration");

                let mut turn = if self.settings.streaming {
                    let mut deltas = self.client.chat_stream(self.request(), cancel.clone()).await?;
                    let mut reasoning = String::new();
                    let mut content = String::new();
                    let mut tool_buf = ToolDeltaBuffer::new();
                    let mut usage = None;
                    while let Some(delta) = deltas.next().await {
                        match delta? {
                            StreamDelta::Content(text) => {
                                content.push_str(&text);
                                yield events::data_delta(&text);
                            }
                            StreamDelta::Reasoning(text) => {
                                reasoning.push_str(&text);
                                yield events::reasoning_delta(&text);
                            }
                            StreamDelta::ToolCall(tc) => tool_buf.push(&tc),
                            StreamDelta::Usage(u) => usage = Some(u),
                        }
                    }
                    AssistantTurn {
                        reasoning: Some(reasoning).filter(|r| !r.trim().is_empty()),
                        content: Some(content).filter(|c| !c.is_empty()),
                        tool_calls: tool_buf.into_calls(),
                        usage,
                    }
                } else {
                    self.client.chat_tools_once(self.request(), &cancel).await?
                };

                for call in turn.tool_calls.iter_mut() {
                    if call.id.as_deref().is_none_or(str::is_empty) {
                        call.id = Some(new_tool_use_id());
                    }
                }
                accumulate(&mut usage_total, turn.usage);

                yield events::assistant_message(&turn);
                self.messages.push(ChatMessage::assistant(
                    turn.content.clone(),
                    turn.tool_calls.clone(),
                ));

                if turn.tool_calls.is_empty() {
                    info!(iterations, tokens = self.client.get_tokens_used(), "agent turn finished");
                    yield events::end_turn(usage_total);
                    break;
                }

                let mut outcomes = Vec::with_capacity(turn.tool_calls.len());
                for call in &turn.tool_calls {
                    outcomes.push(self.run_tool(call).await);
                }
                yield events::tool_results(&outcomes);
                for outcome in outcomes {
                    self.messages.push(ChatMessage::tool(outcome.tool_use_id, outcome.text));
                }
            }
        })
    }
}
