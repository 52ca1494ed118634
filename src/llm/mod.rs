mod client_core;
pub mod reasoning;
mod requests;
pub mod stream;
pub mod stream_tools;
pub mod types;

use reqwest::StatusCode;

pub use client_core::*;
pub use stream::{DeltaStream, StreamDelta, ToolCallDelta};
pub use stream_tools::ToolDeltaBuffer;
pub use types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LlmErrorKind {
    #[error("rate limited by model endpoint")]
    RateLimited,
    #[error("model endpoint server error")]
    Server,
    #[error("network error")]
    Network,
    #[error("request timed out")]
    Timeout,
    #[error("request rejected by model endpoint")]
    Client,
    #[error("malformed model response")]
    Deserialize,
    #[error("request cancelled")]
    Cancelled,
    #[error("unknown model error")]
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited
                | LlmErrorKind::Server
                | LlmErrorKind::Network
                | LlmErrorKind::Timeout
        )
    }
}

pub fn classify_error(status: Option<StatusCode>, err: Option<&reqwest::Error>) -> LlmErrorKind {
    if let Some(st) = status {
        if st == StatusCode::TOO_MANY_REQUESTS {
            return LlmErrorKind::RateLimited;
        }
        if st == StatusCode::REQUEST_TIMEOUT {
            return LlmErrorKind::Timeout;
        }
        if st.is_server_error() {
            return LlmErrorKind::Server;
        }
        if st.is_client_error() {
            return LlmErrorKind::Client;
        }
    }
    if let Some(e) = err {
        if e.is_timeout() {
            return LlmErrorKind::Timeout;
        }
        if e.is_connect() || e.is_body() || e.is_request() {
            return LlmErrorKind::Network;
        }
        if e.is_decode() {
            return LlmErrorKind::Deserialize;
        }
    }
    LlmErrorKind::Unknown
}
