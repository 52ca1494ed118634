use anyhow::{Context, Result, anyhow};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LlmConfig;
use crate::llm::types::ChatRequest;
use crate::llm::{LlmErrorKind, classify_error};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    api_key: String,
    pub(crate) inner: reqwest::Client,
    pub llm_cfg: LlmConfig,
    /// Tracks total tokens used by this client
    tokens_used: Arc<AtomicU32>,
}

impl OpenAIClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            inner,
            llm_cfg: LlmConfig::default(),
            tokens_used: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn with_llm_config(mut self, cfg: LlmConfig) -> Self {
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .read_timeout(Duration::from_millis(cfg.read_timeout_ms));
        // Keep the previous client if the builder rejects the settings.
        match builder.build() {
            Ok(c) => self.inner = c,
            Err(e) => warn!(err = %e, "failed to apply llm timeouts, keeping defaults"),
        }
        self.llm_cfg = cfg;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        if base.ends_with("/v1") {
            base.truncate(base.len() - "/v1".len());
            base = base.trim_end_matches('/').to_string();
        }
        format!("{base}/v1/chat/completions")
    }

    /// Get the total number of tokens used by this client
    pub fn get_tokens_used(&self) -> u32 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    pub fn add_tokens(&self, tokens: u32) {
        self.tokens_used.fetch_add(tokens, Ordering::Relaxed);
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .context("API key is not a valid header value")?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Sends `req` and returns the first successful response. Only
    /// establishing the request is retried; callers read the body themselves.
    pub(crate) async fn send_with_retry(
        &self,
        req: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint();
        let headers = self.headers()?;

        if let Ok(payload) = serde_json::to_string(req) {
            debug!(payload = %payload, endpoint = %url, "sending chat.completions payload");
        }

        let max_attempts = self.llm_cfg.max_retries.saturating_add(1);
        let mut attempt = 1usize;
        loop {
            let fut = self
                .inner
                .post(&url)
                .headers(headers.clone())
                .json(req)
                .send();

            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("chat request cancelled before send");
                    return Err(anyhow!(LlmErrorKind::Cancelled));
                }
                res = fut => res,
            };

            let retry_after = match res {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let retry_after = parse_retry_after(resp.headers());
                    let text = resp.text().await.unwrap_or_default();
                    let kind = classify_error(Some(status), None);
                    if attempt >= max_attempts || !kind.is_retryable() {
                        error!(status = %status.as_u16(), body = %text.trim(), "llm request failed");
                        return Err(anyhow!(kind)
                            .context(format!("chat error: {} - {}", status, text.trim())));
                    }
                    warn!(attempt, status = %status.as_u16(), "retrying chat request after HTTP error");
                    retry_after
                }
                Err(e) => {
                    let kind = classify_error(None, Some(&e));
                    if attempt >= max_attempts || !kind.is_retryable() {
                        return Err(anyhow::Error::new(e)
                            .context(kind)
                            .context("send chat request"));
                    }
                    warn!(attempt, err = %e, "retrying chat request after transport error");
                    None
                }
            };

            let wait = self.backoff_delay(attempt, retry_after);
            debug!(attempt, wait_ms = %wait.as_millis(), "backing off");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("chat request cancelled during retry sleep");
                    return Err(anyhow!(LlmErrorKind::Cancelled));
                }
                _ = tokio::time::sleep(wait) => {}
            }
            attempt += 1;
        }
    }

    pub(crate) fn backoff_delay(&self, attempt: usize, retry_after_secs: Option<u64>) -> Duration {
        if self.llm_cfg.respect_retry_after
            && let Some(secs) = retry_after_secs
        {
            return Duration::from_secs(secs);
        }
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let exp = self.llm_cfg.retry_base_ms.saturating_mul(1u64 << shift);
        let jitter = match self.llm_cfg.retry_jitter_ms {
            0 => 0,
            max => fastrand::u64(0..=max),
        };
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use httptest::{Expectation, Server, matchers::*, responders::*};

    fn request(content: &str) -> ChatRequest {
        ChatRequest {
            model: "openai.gpt-oss-20b-1:0".into(),
            messages: vec![ChatMessage::user(content)],
            max_tokens: Some(4000),
            temperature: Some(0.2),
            stream: Some(false),
            tools: None,
            reasoning_effort: Some("low".into()),
            stream_options: None,
        }
    }

    fn fast_retry(max_retries: usize) -> LlmConfig {
        LlmConfig {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 5_000,
            read_timeout_ms: 5_000,
            max_retries,
            retry_base_ms: 1,
            retry_jitter_ms: 0,
            respect_retry_after: false,
        }
    }

    #[test]
    fn endpoint_normalization() {
        let c = OpenAIClient::new("https://api.example.com/v1/", "x").unwrap();
        assert_eq!(c.endpoint(), "https://api.example.com/v1/chat/completions");
        let c2 = OpenAIClient::new("https://api.example.com/", "x").unwrap();
        assert_eq!(c2.endpoint(), "https://api.example.com/v1/chat/completions");
        let c3 = OpenAIClient::new(
            "https://bedrock-runtime.us-west-2.amazonaws.com/openai/v1",
            "x",
        )
        .unwrap();
        assert_eq!(
            c3.endpoint(),
            "https://bedrock-runtime.us-west-2.amazonaws.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn token_tracking() {
        let client = OpenAIClient::new("https://api.example.com/", "x").unwrap();
        assert_eq!(client.get_tokens_used(), 0);
        client.add_tokens(100);
        client.add_tokens(50);
        assert_eq!(client.get_tokens_used(), 150);
    }

    #[test]
    fn backoff_grows_and_honours_retry_after() {
        let client = OpenAIClient::new("https://api.example.com/", "x")
            .unwrap()
            .with_llm_config(LlmConfig {
                retry_base_ms: 100,
                retry_jitter_ms: 0,
                respect_retry_after: true,
                ..LlmConfig::default()
            });
        assert_eq!(client.backoff_delay(1, None), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(3, None), Duration::from_millis(400));
        assert_eq!(client.backoff_delay(2, Some(7)), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn sends_bearer_auth_to_normalized_endpoint() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/chat/completions"),
                request::headers(contains(key("authorization"))),
            ])
            .respond_with(status_code(200).body("{}")),
        );
        let client = OpenAIClient::new(server.url_str("/v1"), "test-key").unwrap();
        let resp = client
            .send_with_retry(&request("hi"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn retries_server_errors_then_gives_up() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .times(2)
                .respond_with(status_code(500).body("oops")),
        );
        let client = OpenAIClient::new(server.url_str("/"), "x")
            .unwrap()
            .with_llm_config(fast_retry(1));
        let err = client
            .send_with_retry(&request("hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("500"));
        assert_eq!(err.downcast_ref::<LlmErrorKind>(), Some(&LlmErrorKind::Server));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .times(1)
                .respond_with(status_code(400).body("bad")),
        );
        let client = OpenAIClient::new(server.url_str("/"), "x")
            .unwrap()
            .with_llm_config(fast_retry(3));
        let err = client
            .send_with_retry(&request("hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("400"));
        assert_eq!(err.downcast_ref::<LlmErrorKind>(), Some(&LlmErrorKind::Client));
    }

    #[tokio::test]
    async fn cancelled_before_send() {
        let client = OpenAIClient::new("http://127.0.0.1:9", "x").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .send_with_retry(&request("hi"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LlmErrorKind>(),
            Some(&LlmErrorKind::Cancelled)
        );
    }
}
