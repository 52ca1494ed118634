//! Prompt templates served by the math MCP server.

use rmcp::ErrorData as McpError;
use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
};
use serde_json::json;

pub const EXAMPLE_PROMPT: &str = "example_prompt";
pub const SYSTEM_PROMPT: &str = "system_prompt";

const EXAMPLE_DESCRIPTION: &str = "Math assistant prompt with detailed problem-solving guidance";
const SYSTEM_DESCRIPTION: &str =
    "System prompt for a mathematical AI assistant with tool usage guidance";

pub fn example_prompt(question: &str) -> String {
    format!(
        "You are an expert mathematics assistant with access to computational tools.

Your approach to solving mathematical problems:
1. Read and understand the question carefully
2. Break down complex problems into smaller steps
3. Use available tools (add, subtract, multiply, divide) for accurate calculations
4. Show your work clearly with step-by-step reasoning
5. Verify your answer and explain the solution method

Question to solve: {question}

Please provide a detailed solution with clear explanations of your mathematical reasoning.
If calculations are needed, use the appropriate tools to ensure accuracy.
"
    )
}

pub fn system_prompt() -> &'static str {
    "You are an AI assistant specialized in mathematical operations and problem-solving.

When users ask mathematical questions:
1. Use the appropriate tools for calculations when needed
2. Show your work step by step
3. Provide clear explanations of mathematical concepts
4. Double-check your calculations using the available tools

Always prioritize accuracy and clarity in your mathematical responses.
"
}

pub fn list() -> Result<Vec<Prompt>, McpError> {
    let question: PromptArgument = serde_json::from_value(json!({
        "name": "question",
        "description": "The math question to solve",
        "required": true
    }))
    .map_err(|e| McpError::internal_error("build prompt argument", Some(json!(e.to_string()))))?;

    Ok(vec![
        Prompt::new(EXAMPLE_PROMPT, Some(EXAMPLE_DESCRIPTION), Some(vec![question])),
        Prompt::new(SYSTEM_PROMPT, Some(SYSTEM_DESCRIPTION), None),
    ])
}

pub fn render(name: &str, arguments: Option<&JsonObject>) -> Result<GetPromptResult, McpError> {
    let (description, text) = match name {
        EXAMPLE_PROMPT => {
            let question = arguments
                .and_then(|args| args.get("question"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    McpError::invalid_params(
                        "missing required argument: question",
                        Some(json!({"prompt": name})),
                    )
                })?;
            (EXAMPLE_DESCRIPTION, example_prompt(question))
        }
        SYSTEM_PROMPT => (SYSTEM_DESCRIPTION, system_prompt().to_string()),
        other => {
            return Err(McpError::invalid_params(
                format!("unknown prompt: {other}"),
                Some(json!({"prompt": other})),
            ));
        }
    };
    Ok(GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    })
}
