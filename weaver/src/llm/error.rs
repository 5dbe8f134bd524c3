//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of an upstream body kept in error messages
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model server is not configured: {0}")]
    Configuration(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Model server unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Request blocked by tunneling gateway warning page (status {status})")]
    TunnelInterstitial { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Build an API error, truncating the upstream body
    pub fn api(status: u16, body: &str) -> Self {
        LlmError::ApiError {
            status,
            message: truncate(body, MAX_ERROR_BODY_CHARS),
        }
    }

    /// Classify a reqwest transport error
    pub fn from_transport(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Network problems: check connectivity or the tunnel, not credentials
    pub fn is_network(&self) -> bool {
        matches!(self, LlmError::Unreachable { .. } | LlmError::Timeout(_))
    }

    /// The user can reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Unreachable { .. } => true,
            LlmError::Timeout(_) => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::TunnelInterstitial { .. } => true,
            LlmError::Configuration(_) => false,
            LlmError::InvalidResponse(_) => false,
            LlmError::Cancelled => false,
        }
    }

    /// Short hint on how to fix the problem
    pub fn remedy(&self) -> &'static str {
        match self {
            LlmError::Configuration(_) => "Set the server URL and model in the config file.",
            LlmError::ApiError { status, .. } if *status == 404 => "Check that the model is pulled on the server.",
            LlmError::ApiError { .. } => "Check the server logs and try again.",
            LlmError::Unreachable { .. } => "Check that Ollama is running and the tunnel URL is current.",
            LlmError::Timeout(_) => "The server is slow or unreachable; try again or raise timeout-ms.",
            LlmError::TunnelInterstitial { .. } => "Open the tunnel URL in a browser once, or use a direct URL.",
            LlmError::InvalidResponse(_) => "The server replied in an unexpected format.",
            LlmError::Cancelled => "The request was cancelled.",
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_truncates_body() {
        let body = "x".repeat(2000);
        match LlmError::api(502, &body) {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_BODY_CHARS + 3);
                assert!(message.ends_with("..."));
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_is_network() {
        assert!(LlmError::Timeout(Duration::from_secs(10)).is_network());
        assert!(
            LlmError::Unreachable {
                url: "http://localhost:11434".to_string(),
                reason: "connection refused".to_string()
            }
            .is_network()
        );
        assert!(!LlmError::api(500, "boom").is_network());
        assert!(!LlmError::Configuration("model".to_string()).is_network());
    }

    #[test]
    fn test_is_retryable() {
        // 5xx errors should be retryable
        assert!(LlmError::api(503, "busy").is_retryable());

        // 4xx errors should not be retryable
        assert!(!LlmError::api(400, "bad request").is_retryable());

        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::Configuration("base url".to_string()).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
    }

    #[test]
    fn test_interstitial_message_is_distinct() {
        let msg = LlmError::TunnelInterstitial { status: 200 }.to_string();
        assert!(msg.contains("tunneling gateway"));
    }

    #[test]
    fn test_short_body_not_truncated() {
        assert_eq!(truncate("short", 10), "short");
    }
}
