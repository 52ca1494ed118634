use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::llm::stream::ToolCallDelta;
use crate::llm::types::{ToolCall, ToolCallFunction};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconstructedToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: String, // raw JSON string, complete once the stream ends
}

// Buffer to reconstruct tool_calls from streamed deltas
#[derive(Debug, Default)]
pub struct ToolDeltaBuffer {
    // Each index may have an in-progress tool call
    calls: Vec<ReconstructedToolCall>,
}

impl ToolDeltaBuffer {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn push(&mut self, delta: &ToolCallDelta) {
        let (name, args) = match &delta.function {
            Some(f) => (f.name.as_deref(), f.arguments.as_deref()),
            None => (None, None),
        };
        self.push_delta(delta.index.unwrap_or(0), name, args, delta.id.as_deref());
    }

    // Append one delta; index can be sparse/increasing; we resize as needed
    pub fn push_delta(
        &mut self,
        index: usize,
        name_delta: Option<&str>,
        args_delta: Option<&str>,
        id: Option<&str>,
    ) {
        if self.calls.len() <= index {
            self.calls.resize_with(index + 1, Default::default);
        }
        let slot = &mut self.calls[index];
        if let Some(idv) = id
            && slot.id.is_none()
            && !idv.is_empty()
        {
            slot.id = Some(idv.to_string());
        }
        if let Some(n) = name_delta {
            slot.name.push_str(n);
        }
        if let Some(a) = args_delta {
            slot.arguments.push_str(a);
        }
    }

    /// Validates and returns the call at `index`. Empty arguments are
    /// treated as an empty object.
    pub fn finalize_call(&self, index: usize) -> Result<ToolCall> {
        let rc = self
            .calls
            .get(index)
            .ok_or_else(|| anyhow!("no tool call at index {index}"))?;
        if rc.name.is_empty() {
            return Err(anyhow!("tool call missing name"));
        }
        let arguments = if rc.arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            let _parsed: JsonValue = serde_json::from_str(&rc.arguments)
                .map_err(|e| anyhow!("invalid tool arguments JSON: {e}"))?;
            rc.arguments.clone()
        };
        Ok(ToolCall {
            id: rc.id.clone(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: rc.name.clone(),
                arguments,
            },
        })
    }

    /// All reconstructed calls in index order. Slots that never received a
    /// name are dropped; malformed arguments are kept verbatim so the tool
    /// layer can report them back to the model.
    pub fn into_calls(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .filter(|rc| !rc.name.is_empty())
            .map(|rc| ToolCall {
                id: rc.id,
                kind: "function".to_string(),
                function: ToolCallFunction {
                    name: rc.name,
                    arguments: if rc.arguments.trim().is_empty() {
                        "{}".to_string()
                    } else {
                        rc.arguments
                    },
                },
            })
            .collect()
    }
}
