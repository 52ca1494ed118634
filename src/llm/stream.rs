use anyhow::{Result, anyhow};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm::LlmErrorKind;
use crate::llm::client_core::OpenAIClient;
use crate::llm::reasoning::{Piece, ReasoningSplitter};
use crate::llm::types::{ChatRequest, StreamOptions, Usage};

// Stream types
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamChoiceDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    // OpenAI-compatible tool_calls (streamed as incremental deltas)
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>, // "function"
    #[serde(default)]
    pub function: Option<ToolCallFunctionDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolCallFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>, // streamed as partial JSON string
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub delta: StreamChoiceDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    Content(String),
    Reasoning(String),
    ToolCall(ToolCallDelta),
    Usage(Usage),
}

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>;

/// Extracts the JSON payload of one SSE line. Blank lines, comments,
/// non-data fields and the `[DONE]` sentinel yield `None`.
pub fn sse_payload(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    if payload == "[DONE]" {
        return None;
    }
    Some(payload)
}

/// Converts one decoded chunk into deltas, routing inline reasoning tags
/// through `splitter`.
pub fn chunk_deltas(chunk: ChatStreamChunk, splitter: &mut ReasoningSplitter) -> Vec<StreamDelta> {
    let mut out = Vec::new();
    for choice in chunk.choices {
        let delta = choice.delta;
        if let Some(reasoning) = delta.reasoning_content.or(delta.reasoning)
            && !reasoning.is_empty()
        {
            out.push(StreamDelta::Reasoning(reasoning));
        }
        if let Some(content) = delta.content
            && !content.is_empty()
        {
            out.extend(splitter.push(&content).into_iter().map(piece_delta));
        }
        out.extend(delta.tool_calls.into_iter().map(StreamDelta::ToolCall));
    }
    if let Some(usage) = chunk.usage {
        out.push(StreamDelta::Usage(usage));
    }
    out
}

fn piece_delta(piece: Piece) -> StreamDelta {
    match piece {
        Piece::Reasoning(text) => StreamDelta::Reasoning(text),
        Piece::Content(text) => StreamDelta::Content(text),
    }
}

fn line_deltas(line: &[u8], splitter: &mut ReasoningSplitter) -> Vec<StreamDelta> {
    let Ok(text) = std::str::from_utf8(line) else {
        warn!("skipping non UTF-8 stream line");
        return Vec::new();
    };
    let Some(payload) = sse_payload(text) else {
        return Vec::new();
    };
    debug!(response_chunk = %payload, "llm chat_stream response");
    match serde_json::from_str::<ChatStreamChunk>(payload) {
        Ok(chunk) => chunk_deltas(chunk, splitter),
        Err(e) => {
            warn!(payload, err = %e, "failed to parse stream chunk");
            Vec::new()
        }
    }
}

impl OpenAIClient {
    pub async fn chat_stream(
        &self,
        mut req: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<DeltaStream> {
        req.stream = Some(true);
        req.stream_options = Some(StreamOptions {
            include_usage: true,
        });

        // Only establishing the stream is retried, never mid-stream reads.
        let resp = self.send_with_retry(&req, &cancel).await?;

        let mut byte_stream = resp.bytes_stream();
        let client = self.clone();

        let stream = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();
            let mut splitter = ReasoningSplitter::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("chat_stream cancelled during byte stream read");
                        Err(anyhow!(LlmErrorKind::Cancelled))
                    }
                    chunk = byte_stream.next() => Ok(chunk),
                };

                let chunk = match next? {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        warn!(err = %e, "error reading chunk from byte stream");
                        Err(anyhow::Error::new(e).context("byte stream read error"))?;
                        break;
                    }
                    None => break,
                };

                buf.extend_from_slice(&chunk);
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    for delta in line_deltas(&line, &mut splitter) {
                        if let StreamDelta::Usage(usage) = &delta {
                            client.add_tokens(usage.total_tokens);
                        }
                        yield delta;
                    }
                }
            }

            if !buf.is_empty() {
                for delta in line_deltas(&buf, &mut splitter) {
                    if let StreamDelta::Usage(usage) = &delta {
                        client.add_tokens(usage.total_tokens);
                    }
                    yield delta;
                }
            }
            for piece in splitter.finish() {
                yield piece_delta(piece);
            }
        };

        Ok(Box::pin(stream))
    }
}
