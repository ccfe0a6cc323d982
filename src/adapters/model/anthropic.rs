//! Anthropic Messages API model adapter.
//!
//! Makes direct HTTP calls to the Anthropic Messages API, rate-limited
//! by a shared [`governor`] limiter and retried with exponential backoff
//! on transient failures.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use governor::{Quota, RateLimiter};
use governor::state::{InMemoryState, NotKeyed};
use governor::clock::DefaultClock;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ModelConfig;
use crate::domain::ports::{CompletionRequest, CompletionResponse, MessageRole, ModelAdapter};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Model adapter backed by the real Anthropic Messages API.
pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    limiter: Arc<Limiter>,
}

impl AnthropicAdapter {
    pub fn new(config: &ModelConfig) -> DomainResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| DomainError::Adapter(format!("{} is not set", config.api_key_env)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DomainError::Adapter(format!("failed to build HTTP client: {e}")))?;

        let per_minute = std::num::NonZeroU32::new(config.requests_per_minute.max(1)).expect("max(1) is nonzero");
        let burst =
            std::num::NonZeroU32::new(config.max_concurrent_requests.max(1)).expect("max(1) is nonzero");
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
    async fn complete(&self, request: CompletionRequest) -> DomainResult<CompletionResponse> {
        self.limiter.until_ready().await;

        let wire_messages: Vec<WireMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| WireMessage {
                role: if m.role == MessageRole::User { "user" } else { "assistant" },
                content: m.content.clone(),
            })
            .collect();

        let body = MessagesRequest {
            model: "claude-sonnet".to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: wire_messages,
        };

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..ExponentialBackoff::default()
        };

        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let max_retries = self.max_retries;

        let response = retry(backoff, || {
            let attempts = attempts.clone();
            async {
                let attempt = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let result = self
                    .client
                    .post(&self.endpoint)
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&body)
                    .send()
                    .await;

                let response = match result {
                    Ok(r) => r,
                    Err(e) if attempt < max_retries => {
                        return Err(backoff::Error::transient(DomainError::Adapter(e.to_string())));
                    }
                    Err(e) => return Err(backoff::Error::permanent(DomainError::Adapter(e.to_string()))),
                };

                if response.status().is_server_error() && attempt < max_retries {
                    return Err(backoff::Error::transient(DomainError::Adapter(format!(
                        "server error: {}",
                        response.status()
                    ))));
                }

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(backoff::Error::permanent(DomainError::Adapter(format!(
                        "model API error {status}: {body}"
                    ))));
                }

                response
                    .json::<MessagesResponse>()
                    .await
                    .map_err(|e| backoff::Error::permanent(DomainError::Adapter(e.to_string())))
            }
        })
        .await?;

        let content = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            stop_reason: response.stop_reason.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        std::env::remove_var("CONCLAVE_TEST_MISSING_KEY");
        let config = ModelConfig { api_key_env: "CONCLAVE_TEST_MISSING_KEY".to_string(), ..ModelConfig::default() };
        let result = AnthropicAdapter::new(&config);
        assert!(result.is_err());
    }
}
