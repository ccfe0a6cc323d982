//! In-memory mock model adapter, used by application-layer tests that
//! need a deterministic substitute for the real inference service.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{CompletionRequest, CompletionResponse, ModelAdapter};

/// A scripted response queue. Calls beyond the queue repeat the last
/// entry, so a single-entry mock behaves like a constant stub.
pub struct MockModelAdapter {
    responses: RwLock<Vec<Result<String, String>>>,
    calls: AtomicUsize,
}

impl MockModelAdapter {
    pub fn always(content: impl Into<String>) -> Self {
        Self { responses: RwLock::new(vec![Ok(content.into())]), calls: AtomicUsize::new(0) }
    }

    pub fn sequence(responses: Vec<Result<String, String>>) -> Self {
        Self { responses: RwLock::new(responses), calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelAdapter for MockModelAdapter {
    async fn complete(&self, _request: CompletionRequest) -> DomainResult<CompletionResponse> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.read().expect("mock lock poisoned");
        let slot = responses.get(index).or_else(|| responses.last()).cloned();

        match slot {
            Some(Ok(content)) => {
                let input_tokens = 10;
                let output_tokens = content.split_whitespace().count() as u32;
                Ok(CompletionResponse { content, input_tokens, output_tokens, stop_reason: "end_turn".to_string() })
            }
            Some(Err(message)) => Err(DomainError::Adapter(message)),
            None => Err(DomainError::Adapter("mock model adapter has no scripted response".to_string())),
        }
    }
}
