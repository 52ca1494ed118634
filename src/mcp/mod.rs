pub mod arithmetic;
pub mod prompts;
pub mod server;
pub mod service;

#[cfg(test)]
mod tests {
    use crate::mcp::service::{MathMcpService, OperandsParams};
    use crate::mcp::prompts;
    use rmcp::ServerHandler;
    use rmcp::handler::server::wrapper::Parameters;
    use rmcp::model::{ErrorCode, JsonObject, PromptMessageContent, RawContent};
    use serde_json::json;

    fn operands(a: i64, b: i64) -> Parameters<OperandsParams> {
        Parameters(OperandsParams { a, b })
    }

    fn text_of(result: rmcp::model::CallToolResult) -> String {
        assert_eq!(result.content.len(), 1);
        if let RawContent::Text(ref text) = result.content[0].raw {
            text.text.clone()
        } else {
            panic!("Expected text content");
        }
    }

    #[test]
    fn service_exposes_the_four_tools() {
        let service = MathMcpService::default();
        for name in ["add", "subtract", "multiply", "divide"] {
            assert!(service.tool_router.has_route(name), "{name}");
        }
        assert!(!service.tool_router.has_route("say_hello"));
    }

    #[test]
    fn integer_tools_return_decimal_text() {
        let service = MathMcpService::new();
        assert_eq!(text_of(service.add(operands(5, 3)).unwrap()), "8");
        assert_eq!(text_of(service.subtract(operands(5, 8)).unwrap()), "-3");
        assert_eq!(text_of(service.multiply(operands(4, 7)).unwrap()), "28");
    }

    #[test]
    fn divide_returns_float_text() {
        let service = MathMcpService::new();
        assert_eq!(text_of(service.divide(operands(10, 2)).unwrap()), "5.0");
        assert_eq!(
            text_of(service.divide(operands(7, 3)).unwrap()),
            "2.3333333333333335"
        );
        assert_eq!(text_of(service.divide(operands(-15, 3)).unwrap()), "-5.0");
    }

    #[test]
    fn arithmetic_faults_are_invalid_params() {
        let service = MathMcpService::new();
        let err = service.divide(operands(1, 0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("division by zero"));

        let err = service.multiply(operands(i64::MAX, 2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("overflow"));
    }

    #[test]
    fn server_info_advertises_tools_and_prompts() {
        let info = MathMcpService::new().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert!(info.instructions.unwrap().contains("arithmetic"));
    }

    #[test]
    fn prompts_are_listed() {
        let listed = prompts::list().unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, [prompts::EXAMPLE_PROMPT, prompts::SYSTEM_PROMPT]);
        let args = listed[0].arguments.as_ref().unwrap();
        assert_eq!(args[0].name, "question");
        assert_eq!(args[0].required, Some(true));
        assert!(listed[1].arguments.is_none());
    }

    #[test]
    fn example_prompt_embeds_the_question() {
        let mut args = JsonObject::new();
        args.insert("question".into(), json!("What is 12 * 7?"));
        let result = prompts::render(prompts::EXAMPLE_PROMPT, Some(&args)).unwrap();
        assert_eq!(result.messages.len(), 1);
        match &result.messages[0].content {
            PromptMessageContent::Text { text } => {
                assert!(text.contains("Question to solve: What is 12 * 7?"));
                assert!(text.contains("add, subtract, multiply, divide"));
            }
            other => panic!("unexpected prompt content {other:?}"),
        }
    }

    #[test]
    fn prompt_errors_are_invalid_params() {
        let err = prompts::render(prompts::EXAMPLE_PROMPT, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let err = prompts::render("nope", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(prompts::render(prompts::SYSTEM_PROMPT, None).is_ok());
    }
}
