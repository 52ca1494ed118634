//! Tools the agent may call during a turn.

pub mod calculator;
pub mod current_time;
pub mod file_read;
pub mod file_write;
pub mod http_request;

use crate::llm::types::{ToolCall, ToolDef};
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A callable exposed to the model.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &'static str;

    /// OpenAI function schema advertised to the model.
    fn tool_def(&self) -> ToolDef;

    async fn call(&self, args: &Value) -> Result<Value>;
}

/// Routes tool calls by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Calculator, file read/write, HTTP and clock tools. Relative file
    /// paths resolve against `project_root`.
    pub fn with_defaults(project_root: PathBuf) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(calculator::Calculator));
        registry.register(Box::new(file_read::FileRead::new(project_root.clone())));
        registry.register(Box::new(file_write::FileWrite::new(project_root)));
        registry.register(Box::new(http_request::HttpRequest::new()?));
        registry.register(Box::new(current_time::CurrentTime));
        Ok(registry)
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        if self.get(tool.name()).is_some() {
            warn!(tool = tool.name(), "replacing already registered tool");
            self.tools.retain(|t| t.name() != tool.name());
        }
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn defs(&self) -> Vec<ToolDef> {
        self.tools.iter().map(|t| t.tool_def()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool: {name}"))?;
        debug!(tool = %name, args = %args, "dispatching tool call");
        tool.call(args).await
    }

    /// Parses the JSON argument string of a model tool call and dispatches it.
    pub async fn dispatch_call(&self, call: &ToolCall) -> Result<Value> {
        if call.kind != "function" {
            return Err(anyhow!("unsupported tool type: {}", call.kind));
        }
        let args = parse_arguments(&call.function.arguments)?;
        self.dispatch(&call.function.name, &args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| anyhow!("invalid tool args: {e}"))
}

/// Text handed back to the model: strings verbatim, everything else as
/// pretty-printed JSON.
pub fn result_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing required string argument '{key}'"))
}

pub(crate) fn optional_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}
