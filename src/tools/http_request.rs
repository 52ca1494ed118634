use crate::llm::types::ToolDef;
use crate::tools::{Tool, required_str};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub const MAX_BODY_CHARS: usize = 20_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ALLOWED_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

pub fn tool_def() -> ToolDef {
    ToolDef::function(
        "http_request",
        "Performs an HTTP request and returns the status code, response headers and body. Only http and https URLs are allowed; the body is truncated to 20000 characters.",
        json!({
            "type": "object",
            "properties": {
                "method": {"type": "string", "enum": ALLOWED_METHODS},
                "url": {"type": "string"},
                "headers": {"type": "object", "additionalProperties": {"type": "string"}},
                "body": {"type": "string"}
            },
            "required": ["method", "url"]
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct HttpResponseSummary {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub truncated: bool,
}

fn parse_method(raw: &str) -> Result<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    if !ALLOWED_METHODS.contains(&upper.as_str()) {
        bail!("unsupported HTTP method: {raw}");
    }
    Method::from_bytes(upper.as_bytes()).map_err(|e| anyhow!("invalid HTTP method {raw}: {e}"))
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

pub struct HttpRequest {
    client: reqwest::Client,
}

impl HttpRequest {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build HTTP client for http_request tool")?;
        Ok(Self { client })
    }

    pub async fn send(
        &self,
        method: &str,
        url: &str,
        headers: Option<&Map<String, Value>>,
        body: Option<&str>,
    ) -> Result<HttpResponseSummary> {
        let method = parse_method(method)?;
        let parsed = reqwest::Url::parse(url).with_context(|| format!("invalid URL {url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("only http and https URLs are allowed");
        }

        let mut req = self.client.request(method.clone(), parsed);
        if let Some(headers) = headers {
            for (name, value) in headers {
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                req = req.header(name.as_str(), value);
            }
        }
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        debug!(method = %method, url, "http_request tool sending");
        let resp = req.send().await.context("send HTTP request")?;
        let status = resp.status().as_u16();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let text = resp.text().await.context("read HTTP response body")?;
        let (body, truncated) = truncate_chars(&text, MAX_BODY_CHARS);
        Ok(HttpResponseSummary {
            status,
            headers,
            body,
            truncated,
        })
    }
}

#[async_trait::async_trait]
impl Tool for HttpRequest {
    fn name(&self) -> &'static str {
        "http_request"
    }

    fn tool_def(&self) -> ToolDef {
        tool_def()
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let method = required_str(args, "method")?;
        let url = required_str(args, "url")?;
        let headers = args.get("headers").and_then(|v| v.as_object());
        let body = args.get("body").and_then(|v| v.as_str());
        let summary = self.send(method, url, headers, body).await?;
        Ok(serde_json::to_value(summary)?)
    }
}
