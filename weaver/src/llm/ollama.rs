//! Ollama API client implementation
//!
//! Implements the LlmClient trait for Ollama's `/api/chat` and
//! `/api/generate` endpoints. Responses are requested with `stream: false`
//! and decoded in one piece. Servers are frequently exposed through an
//! ngrok tunnel, so every request opts out of the browser warning page and
//! an HTML reply is reported as a gateway interstitial rather than as a
//! JSON error.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message};
use crate::config::{ApiMode, LlmConfig};

/// Header that tells the ngrok edge to skip its browser warning page
pub const SKIP_BROWSER_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// Ollama API client
pub struct OllamaClient {
    model: String,
    base_url: String,
    api: ApiMode,
    http: Client,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration
    ///
    /// Fails with `LlmError::Configuration` when the base URL or model is
    /// empty; no request is made.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(LlmError::Configuration("base URL is empty".to_string()));
        }
        let model = config.model.trim().to_string();
        if model.is_empty() {
            return Err(LlmError::Configuration("model is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(SKIP_BROWSER_WARNING_HEADER, HeaderValue::from_static("true"));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model,
            base_url,
            api: config.api,
            http,
            timeout: Duration::from_millis(config.timeout_ms),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Flatten system prompt and history into one prompt for `/api/generate`
    fn build_prompt(request: &CompletionRequest) -> String {
        debug!(message_count = %request.messages.len(), "build_prompt: called");
        let mut prompt = String::new();
        if !request.system_prompt.is_empty() {
            prompt.push_str(&request.system_prompt);
            prompt.push_str("\n\n");
        }
        for msg in &request.messages {
            prompt.push_str(msg.role.label());
            prompt.push_str(": ");
            prompt.push_str(&msg.content);
            prompt.push_str("\n\n");
        }
        prompt.push_str("Assistant:");
        prompt
    }

    fn convert_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
        debug!(message_count = %request.messages.len(), "convert_messages: called");
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m: &Message| ChatMessage {
            role: m.role.label().to_lowercase(),
            content: m.content.clone(),
        }));
        messages
    }

    /// Send a request and return status, content type and body text
    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<(u16, Option<String>, String), LlmError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(url, timeout, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(url, timeout, e))?;

        debug!(%status, body_len = body.len(), "exchange: response received");
        Ok((status, content_type, body))
    }

    async fn complete_inner(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match self.api {
            ApiMode::Generate => {
                let url = format!("{}/api/generate", self.base_url);
                let body = GenerateRequest {
                    model: &self.model,
                    prompt: Self::build_prompt(request),
                    stream: false,
                };
                let (status, content_type, text) =
                    self.exchange(self.http.post(&url).json(&body), &url, self.timeout).await?;
                let parsed: GenerateResponse = decode(status, content_type.as_deref(), &text)?;
                Ok(CompletionResponse {
                    content: parsed.response,
                    prompt_tokens: parsed.prompt_eval_count,
                    completion_tokens: parsed.eval_count,
                })
            }
            ApiMode::Chat => {
                let url = format!("{}/api/chat", self.base_url);
                let body = ChatRequest {
                    model: &self.model,
                    messages: Self::convert_messages(request),
                    stream: false,
                };
                let (status, content_type, text) =
                    self.exchange(self.http.post(&url).json(&body), &url, self.timeout).await?;
                let parsed: ChatResponse = decode(status, content_type.as_deref(), &text)?;
                Ok(CompletionResponse {
                    content: parsed.message.content,
                    prompt_tokens: parsed.prompt_eval_count,
                    completion_tokens: parsed.eval_count,
                })
            }
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, api = ?self.api, "complete: called");
        if cancel.is_cancelled() {
            debug!("complete: already cancelled");
            return Err(LlmError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("complete: cancelled while waiting for model");
                Err(LlmError::Cancelled)
            }
            result = self.complete_inner(&request) => {
                if let Err(e) = &result {
                    warn!(error = %e, "complete: request failed");
                }
                result
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        debug!(base_url = %self.base_url, "list_models: called");
        let url = format!("{}/api/tags", self.base_url);
        let (status, content_type, text) = self.exchange(self.http.get(&url), &url, self.probe_timeout).await?;
        let tags: TagsResponse = decode(status, content_type.as_deref(), &text)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Turn an HTTP reply into a typed body or a classified error
fn decode<T: serde::de::DeserializeOwned>(status: u16, content_type: Option<&str>, body: &str) -> Result<T, LlmError> {
    let success = (200..300).contains(&status);

    if looks_like_html(content_type, body) && (success || mentions_gateway(body)) {
        debug!(%status, "decode: HTML interstitial detected");
        return Err(LlmError::TunnelInterstitial { status });
    }

    if !success {
        debug!(%status, "decode: API error");
        return Err(LlmError::api(status, body));
    }

    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "decode: body is not JSON");
        LlmError::InvalidResponse(format!("body is not JSON: {}", e))
    })?;
    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "decode: unexpected JSON shape");
        LlmError::InvalidResponse(format!("unexpected response shape: {}", e))
    })
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return true;
    }
    let head: String = body.trim_start().chars().take(15).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn mentions_gateway(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("ngrok") || lower.contains("tunnel")
}
