use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::LlmErrorKind;
use crate::llm::client_core::OpenAIClient;
use crate::llm::types::{AssistantTurn, ChatRequest, ChatResponse};

impl OpenAIClient {
    /// Runs one non-streaming turn and returns the first choice.
    pub async fn chat_tools_once(
        &self,
        mut req: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<AssistantTurn> {
        req.stream = Some(false);
        req.stream_options = None;

        let resp = self.send_with_retry(&req, cancel).await?;

        let response_text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("chat_tools_once cancelled during body read");
                return Err(anyhow!(LlmErrorKind::Cancelled));
            }
            res = resp.text() => res.context("read chat response body")?,
        };

        debug!(response_body = %response_text, "llm chat_tools_once response");
        let body: ChatResponse = serde_json::from_str(response_text.trim())
            .map_err(|e| anyhow!(LlmErrorKind::Deserialize).context(e.to_string()))
            .context("decode chat response")?;

        if let Some(usage) = &body.usage {
            self.add_tokens(usage.total_tokens);
        }

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no choices in chat response"))?;
        Ok(AssistantTurn::from_message(choice.message, body.usage))
    }
}
