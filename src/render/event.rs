//! Boundary adapter from raw agent events to typed content items.
//!
//! The agent runtime emits loosely shaped JSON objects. They are inspected
//! exactly once here; everything downstream matches on [`ContentItem`].

use serde_json::{Map, Value};

/// Status shown for a tool result whose producer omitted it.
pub const UNKNOWN_STATUS: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Reasoning { text: String },
    Text { text: String },
    ToolUse { name: String, input: Value },
    ToolResult { status: String, text: String },
}

impl ContentItem {
    /// Classifies one raw item. Keys are probed in the order
    /// `reasoningContent`, `text`, `toolUse`, `toolResult`; the first hit wins.
    /// Items carrying none of them yield `None`.
    pub fn from_raw(item: &Value) -> Option<Self> {
        let obj = item.as_object()?;

        if let Some(reasoning) = obj.get("reasoningContent") {
            let text = reasoning
                .pointer("/reasoningText/text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Some(ContentItem::Reasoning {
                text: text.to_string(),
            });
        }

        if let Some(text) = obj.get("text") {
            return Some(ContentItem::Text {
                text: text.as_str().unwrap_or_default().to_string(),
            });
        }

        if let Some(tool_use) = obj.get("toolUse") {
            let name = tool_use
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let input = tool_use
                .get("input")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            return Some(ContentItem::ToolUse {
                name: name.to_string(),
                input,
            });
        }

        if let Some(result) = obj.get("toolResult") {
            let status = result
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_STATUS);
            let text = result
                .get("content")
                .and_then(Value::as_array)
                .and_then(|entries| entries.first())
                .and_then(|first| first.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Some(ContentItem::ToolResult {
                status: status.to_string(),
                text: text.to_string(),
            });
        }

        None
    }
}

/// One unit of streamed agent output, reduced to its content items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionEvent {
    pub items: Vec<ContentItem>,
}

impl InteractionEvent {
    /// Returns `None` when the event carries no structured message content.
    /// That is the normal case for progress events and is not an error.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let message = raw.get("message")?.as_object()?;
        let content = message.get("content")?.as_array()?;
        Some(Self {
            items: content.iter().filter_map(ContentItem::from_raw).collect(),
        })
    }
}
