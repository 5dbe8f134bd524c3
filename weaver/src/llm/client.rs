//! LlmClient trait definition

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// The whole conversation is sent on every call; the client keeps no
/// history between calls. Responses are never streamed so the agent loop
/// always parses a complete reply.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    ///
    /// Returns `LlmError::Cancelled` as soon as `cancel` fires.
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, LlmError>;

    /// List the models available on the server (connection probe)
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Model identifier used for completions
    fn model(&self) -> &str;
}
