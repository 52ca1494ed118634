//! Builders for the raw JSON events an agent run emits.

use crate::llm::types::{AssistantTurn, Usage};
use crate::tools::parse_arguments;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Success,
    Error,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Success => "success",
            ToolStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool_use_id: String,
    pub status: ToolStatus,
    pub text: String,
}

pub fn init_event_loop() -> Value {
    json!({"init_event_loop": true})
}

pub fn data_delta(text: &str) -> Value {
    json!({"data": text})
}

pub fn reasoning_delta(text: &str) -> Value {
    json!({"reasoningText": text, "reasoning": true})
}

/// The assistant message: reasoning first, then text, then one `toolUse`
/// per call. Unparseable arguments are passed through as a string.
pub fn assistant_message(turn: &AssistantTurn) -> Value {
    let mut content = Vec::new();
    if let Some(reasoning) = &turn.reasoning {
        content.push(json!({"reasoningContent": {"reasoningText": {"text": reasoning}}}));
    }
    if let Some(text) = &turn.content {
        content.push(json!({"text": text}));
    }
    for call in &turn.tool_calls {
        let input = parse_arguments(&call.function.arguments)
            .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));
        content.push(json!({"toolUse": {
            "toolUseId": call.id.clone().unwrap_or_default(),
            "name": call.function.name,
            "input": input,
        }}));
    }
    json!({"message": {"role": "assistant", "content": content}})
}

pub fn tool_results(outcomes: &[ToolOutcome]) -> Value {
    let content: Vec<Value> = outcomes
        .iter()
        .map(|o| {
            json!({"toolResult": {
                "toolUseId": o.tool_use_id,
                "status": o.status.as_str(),
                "content": [{"text": o.text}],
            }})
        })
        .collect();
    json!({"message": {"role": "user", "content": content}})
}

pub fn end_turn(usage: Option<Usage>) -> Value {
    let mut result = json!({"stop_reason": "end_turn"});
    if let Some(usage) = usage {
        result["usage"] = json!({
            "inputTokens": usage.prompt_tokens,
            "outputTokens": usage.completion_tokens,
            "totalTokens": usage.total_tokens,
        });
    }
    json!({"result": result})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ToolCall, ToolCallFunction};
    use crate::render::{ContentItem, InteractionEvent};

    #[test]
    fn assistant_message_round_trips_through_the_adapter() {
        let turn = AssistantTurn {
            reasoning: Some("add them".into()),
            content: Some("Let me check.".into()),
            tool_calls: vec![ToolCall {
                id: Some("tooluse_1".into()),
                kind: "function".into(),
                function: ToolCallFunction {
                    name: "calculator".into(),
                    arguments: "{\"expression\":\"2+2\"}".into(),
                },
            }],
            usage: None,
        };
        let event = InteractionEvent::from_raw(&assistant_message(&turn)).unwrap();
        assert_eq!(
            event.items,
            vec![
                ContentItem::Reasoning {
                    text: "add them".into()
                },
                ContentItem::Text {
                    text: "Let me check.".into()
                },
                ContentItem::ToolUse {
                    name: "calculator".into(),
                    input: json!({"expression": "2+2"}),
                },
            ]
        );
    }

    #[test]
    fn tool_results_carry_status() {
        let raw = tool_results(&[ToolOutcome {
            tool_use_id: "t1".into(),
            status: ToolStatus::Error,
            text: "unknown tool: nope".into(),
        }]);
        assert_eq!(raw["message"]["role"], "user");
        let event = InteractionEvent::from_raw(&raw).unwrap();
        assert_eq!(
            event.items,
            vec![ContentItem::ToolResult {
                status: "error".into(),
                text: "unknown tool: nope".into(),
            }]
        );
    }

    #[test]
    fn progress_events_have_no_message() {
        for raw in [
            init_event_loop(),
            data_delta("4"),
            reasoning_delta("hm"),
            end_turn(Some(Usage::default())),
        ] {
            assert!(InteractionEvent::from_raw(&raw).is_none());
        }
    }
}
