use super::*;
use crate::agent::EventStream;
use futures::StreamExt;
use serde_json::{Value, json};

/// Replays the same events for every query and records what it was asked.
#[derive(Default)]
struct ScriptedAgent {
    events: Vec<Value>,
    fail: bool,
    cancel_after_first: Option<CancellationToken>,
    queries: Vec<String>,
}

impl ScriptedAgent {
    fn answering(text: &str) -> Self {
        Self {
            events: vec![
                json!({"init_event_loop": true}),
                json!({"message": {"role": "assistant", "content": [{"text": text}]}}),
                json!({"result": {"stop_reason": "end_turn"}}),
            ],
            ..Default::default()
        }
    }
}

impl AgentRuntime for ScriptedAgent {
    fn stream_async<'a>(&'a mut self, query: &str) -> EventStream<'a> {
        self.queries.push(query.to_string());
        let mut items: Vec<anyhow::Result<Value>> = self.events.iter().cloned().map(Ok).collect();
        if self.fail {
            items.push(Err(anyhow::anyhow!("connection reset")));
        }
        let cancel = self.cancel_after_first.clone();
        Box::pin(futures::stream::iter(items).inspect(move |_| {
            if let Some(token) = &cancel {
                token.cancel();
            }
        }))
    }
}

async fn run_session(input: &str, agent: &mut ScriptedAgent, interrupt: CancellationToken) -> (SessionEnd, String) {
    let mut session = InteractiveSession::new(
        input.as_bytes(),
        Vec::new(),
        StreamRenderer::new(true),
        interrupt,
    );
    let end = session.run(agent).await.unwrap();
    (end, String::from_utf8(session.into_output()).unwrap())
}

#[test]
fn exit_words_match_in_any_case() {
    for word in ["exit", "QUIT", "/quit", "Bye", "  exit  "] {
        assert!(is_exit_command(word), "{word}");
    }
    for word in ["", "exit now", "quitter", "/exit"] {
        assert!(!is_exit_command(word), "{word}");
    }
}

#[test]
fn banner_lists_settings_between_rules() {
    let cfg = AppConfig::default();
    let mut out = Vec::new();
    write_config_banner(&mut out, &cfg).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "=".repeat(RULE_WIDTH));
    assert_eq!(lines[4], lines[0]);
    assert_eq!(lines[1], "🤖 Model: openai.gpt-oss-20b-1:0");
    assert_eq!(
        lines[2],
        "🎛️ Max tokens: 4000, 🌡️ Temperature: 0.2, 🌊 Streaming: true"
    );
    assert_eq!(lines[3], "🧠 Show reasoning: true, 💭 Reasoning effort: low");
}

#[tokio::test]
async fn exit_word_says_goodbye_once() {
    let mut agent = ScriptedAgent::answering("unused");
    let (end, out) = run_session("QUIT\nhello\n", &mut agent, CancellationToken::new()).await;
    assert_eq!(end, SessionEnd::ExitCommand);
    assert_eq!(out.matches(FAREWELL).count(), 1);
    assert!(out.starts_with("\n🧬 OSS Agent 🧬 - Interactive Mode\nType 'exit' or 'quit' to end.\n"));
    assert!(agent.queries.is_empty());
}

#[tokio::test]
async fn empty_lines_prompt_again() {
    let mut agent = ScriptedAgent::answering("unused");
    let (end, out) = run_session("\n   \nbye\n", &mut agent, CancellationToken::new()).await;
    assert_eq!(end, SessionEnd::ExitCommand);
    assert_eq!(out.matches(PROMPT).count(), 3);
    assert!(agent.queries.is_empty());
}

#[tokio::test]
async fn end_of_input_says_goodbye() {
    let mut agent = ScriptedAgent::answering("unused");
    let (end, out) = run_session("", &mut agent, CancellationToken::new()).await;
    assert_eq!(end, SessionEnd::EndOfInput);
    assert!(out.ends_with(&format!("\n{FAREWELL}\n")));
    assert_eq!(out.matches(FAREWELL).count(), 1);
}

#[tokio::test]
async fn queries_render_then_print_a_separator() {
    let mut agent = ScriptedAgent::answering("4");
    let (end, out) = run_session("  what is 2+2?  \nexit\n", &mut agent, CancellationToken::new()).await;
    assert_eq!(end, SessionEnd::ExitCommand);
    assert_eq!(agent.queries, vec!["what is 2+2?".to_string()]);
    assert!(out.ends_with(&format!("\n💬 Response:\n4\n\n\n\n{PROMPT}{FAREWELL}\n")));
    assert_eq!(out.matches(FAREWELL).count(), 1);
}

#[tokio::test]
async fn interrupt_at_the_prompt_ends_the_session() {
    let interrupt = CancellationToken::new();
    interrupt.cancel();
    let mut agent = ScriptedAgent::answering("unused");
    let (end, out) = run_session("hello\n", &mut agent, interrupt).await;
    assert_eq!(end, SessionEnd::Interrupted);
    assert!(out.ends_with(&format!("{PROMPT}\n{FAREWELL}\n")));
    assert!(agent.queries.is_empty());
}

#[tokio::test]
async fn interrupt_while_rendering_ends_the_session() {
    let interrupt = CancellationToken::new();
    let mut agent = ScriptedAgent::answering("never shown");
    agent.cancel_after_first = Some(interrupt.clone());
    let (end, out) = run_session("first\nsecond\n", &mut agent, interrupt).await;
    assert_eq!(end, SessionEnd::Interrupted);
    assert_eq!(agent.queries, vec!["first".to_string()]);
    assert!(!out.contains("never shown"));
    assert_eq!(out.matches(FAREWELL).count(), 1);
}

#[tokio::test]
async fn upstream_failure_propagates() {
    let mut agent = ScriptedAgent {
        fail: true,
        ..ScriptedAgent::answering("partial")
    };
    let mut session = InteractiveSession::new(
        "hi\n".as_bytes(),
        Vec::new(),
        StreamRenderer::new(true),
        CancellationToken::new(),
    );
    let err = session.run(&mut agent).await.unwrap_err();
    assert!(format!("{err:#}").contains("connection reset"));
    let out = String::from_utf8(session.into_output()).unwrap();
    assert_eq!(out.matches(FAREWELL).count(), 0);
}

#[tokio::test]
async fn batch_renders_a_single_query() {
    let mut agent = ScriptedAgent::answering("done");
    let mut out = Vec::new();
    let outcome = run_batch(
        &mut agent,
        StreamRenderer::new(false),
        "do the thing",
        &mut out,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, RenderOutcome::Completed { segments: 1 });
    assert_eq!(String::from_utf8(out).unwrap(), "\n💬 Response:\ndone\n\n");
}

#[tokio::test]
async fn exit_word_works_without_an_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = crate::config::AppConfig {
        api_key: None,
        project_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut agent = crate::agent::Agent::from_config(&cfg).unwrap();
    let mut session = InteractiveSession::new(
        "quit\n".as_bytes(),
        Vec::new(),
        StreamRenderer::new(true),
        CancellationToken::new(),
    );
    assert_eq!(session.run(&mut agent).await.unwrap(), SessionEnd::ExitCommand);
    let out = String::from_utf8(session.into_output()).unwrap();
    assert_eq!(out.matches(FAREWELL).count(), 1);
}
