//! Turns the agent's event stream into categorised terminal output.

pub mod event;
pub mod segment;

pub use event::{ContentItem, InteractionEvent, UNKNOWN_STATUS};
pub use segment::{Segment, SegmentKind, SegmentSink, WriterSink, render_tool_input};

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The stream ran to its end.
    Completed { segments: usize },
    /// The caller cancelled between events.
    Cancelled { segments: usize },
}

impl RenderOutcome {
    pub fn segments(&self) -> usize {
        match self {
            RenderOutcome::Completed { segments } | RenderOutcome::Cancelled { segments } => {
                *segments
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StreamRenderer {
    show_reasoning: bool,
}

impl StreamRenderer {
    pub fn new(show_reasoning: bool) -> Self {
        Self { show_reasoning }
    }

    pub fn show_reasoning(&self) -> bool {
        self.show_reasoning
    }

    /// Segments produced by a single content item. Payloads pass through
    /// unchanged; text that is blank after trimming is dropped.
    pub fn segments_for(&self, item: &ContentItem) -> Vec<Segment> {
        match item {
            ContentItem::Reasoning { text } => {
                if !self.show_reasoning {
                    return Vec::new();
                }
                vec![Segment::Reasoning(text.clone())]
            }
            ContentItem::Text { text } => {
                if text.trim().is_empty() {
                    return Vec::new();
                }
                vec![Segment::Response(text.clone())]
            }
            ContentItem::ToolUse { name, input } => vec![
                Segment::ToolName(name.clone()),
                Segment::ToolInput(render_tool_input(input)),
            ],
            ContentItem::ToolResult { status, text } => vec![Segment::ToolResult {
                status: status.clone(),
                text: text.clone(),
            }],
        }
    }

    /// Renders every item of one event in order and returns how many
    /// segments were written.
    pub fn render_event<K>(&self, event: &InteractionEvent, sink: &mut K) -> io::Result<usize>
    where
        K: SegmentSink + ?Sized,
    {
        let mut written = 0;
        for item in &event.items {
            for segment in self.segments_for(item) {
                sink.emit(segment)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Classifies one raw event and renders it. Events without message
    /// content produce nothing.
    pub fn render_raw<K>(&self, raw: &Value, sink: &mut K) -> io::Result<usize>
    where
        K: SegmentSink + ?Sized,
    {
        match InteractionEvent::from_raw(raw) {
            Some(event) => self.render_event(&event, sink),
            None => {
                trace!("skipping event without message content");
                Ok(0)
            }
        }
    }

    /// Drains `events` in arrival order. Cancellation is observed between
    /// events, never in the middle of one. Producer errors are propagated
    /// after everything received before them has been written.
    pub async fn render<S, K>(
        &self,
        mut events: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome>
    where
        S: Stream<Item = Result<Value>> + Unpin,
        K: SegmentSink + ?Sized,
    {
        let mut segments = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(segments, "render cancelled");
                    return Ok(RenderOutcome::Cancelled { segments });
                }
                next = events.next() => next,
            };
            let Some(raw) = next else {
                break;
            };
            let raw = raw.context("agent event stream failed")?;
            segments += self
                .render_raw(&raw, sink)
                .context("failed to write rendered output")?;
        }
        debug!(segments, "render completed");
        Ok(RenderOutcome::Completed { segments })
    }
}
