use crate::mcp::arithmetic::{self, ArithmeticError};
use crate::mcp::prompts;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct OperandsParams {
    #[schemars(description = "The first integer operand")]
    pub a: i64,
    #[schemars(description = "The second integer operand")]
    pub b: i64,
}

#[derive(Clone)]
pub struct MathMcpService {
    pub tool_router: ToolRouter<MathMcpService>,
}

impl Default for MathMcpService {
    fn default() -> Self {
        Self::new()
    }
}

fn arithmetic_error(op: &str, params: &OperandsParams, err: ArithmeticError) -> McpError {
    warn!(op, a = params.a, b = params.b, err = %err, "arithmetic tool failed");
    McpError::invalid_params(
        err.to_string(),
        Some(json!({"operation": op, "a": params.a, "b": params.b})),
    )
}

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

impl MathMcpService {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MathMcpService {
    #[tool(
        description = "Adds two integers and returns the sum (a + b). Examples: add(5, 3) -> 8, add(-2, 7) -> 5."
    )]
    pub fn add(
        &self,
        Parameters(params): Parameters<OperandsParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(a = params.a, b = params.b, "add");
        match arithmetic::add(params.a, params.b) {
            Ok(sum) => text_result(sum.to_string()),
            Err(e) => Err(arithmetic_error("add", &params, e)),
        }
    }

    #[tool(
        description = "Subtracts b from a and returns the difference (a - b). Examples: subtract(10, 3) -> 7, subtract(5, 8) -> -3."
    )]
    pub fn subtract(
        &self,
        Parameters(params): Parameters<OperandsParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(a = params.a, b = params.b, "subtract");
        match arithmetic::subtract(params.a, params.b) {
            Ok(diff) => text_result(diff.to_string()),
            Err(e) => Err(arithmetic_error("subtract", &params, e)),
        }
    }

    #[tool(
        description = "Multiplies two integers and returns the product (a * b). Examples: multiply(4, 7) -> 28, multiply(-3, 5) -> -15."
    )]
    pub fn multiply(
        &self,
        Parameters(params): Parameters<OperandsParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(a = params.a, b = params.b, "multiply");
        match arithmetic::multiply(params.a, params.b) {
            Ok(product) => text_result(product.to_string()),
            Err(e) => Err(arithmetic_error("multiply", &params, e)),
        }
    }

    #[tool(
        description = "Divides a by b and returns the quotient as a float (a / b). Examples: divide(10, 2) -> 5.0, divide(7, 3) -> 2.3333333333333335. Division by zero is an error."
    )]
    pub fn divide(
        &self,
        Parameters(params): Parameters<OperandsParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(a = params.a, b = params.b, "divide");
        match arithmetic::divide(params.a, params.b) {
            Ok(quotient) => text_result(arithmetic::format_quotient(quotient)),
            Err(e) => Err(arithmetic_error("divide", &params, e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for MathMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides integer arithmetic tools (add, subtract, multiply, divide) and prompts for step-by-step math problem solving.".to_string(),
            ),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            next_cursor: None,
            prompts: prompts::list()?,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        debug!(prompt = %request.name, "get_prompt");
        prompts::render(&request.name, request.arguments.as_ref())
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
