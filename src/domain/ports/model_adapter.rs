//! Model-inference adapter port: the seam through which Planner, Worker,
//! and Judge runtimes invoke the external language model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// A single turn in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A completion request sent to the model adapter.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ModelMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A completion response from the model adapter.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub stop_reason: String,
}

/// Port for invoking the external model-inference service.
///
/// Implementations are responsible for their own rate limiting and retry
/// policy; callers treat every call as potentially slow and fallible.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Run a single completion request to exhaustion (no streaming).
    async fn complete(&self, request: CompletionRequest) -> DomainResult<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_serializes_snake_case() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
