//! Scriptable completion client for tests.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use handbook_core::{AppError, AppResult, ProviderKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Arc<dyn Fn(&LlmRequest) -> AppResult<String> + Send + Sync>;

/// Completion client whose answers are produced by a closure.
///
/// Every request is recorded so tests can inspect the rendered prompts.
#[derive(Clone)]
pub struct MockLlmClient {
    responder: Responder,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlmClient {
    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_| Ok(text.clone()))
    }

    /// Answer by calling `responder` with each request.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every request with a provider error.
    pub fn failing(retryable: bool) -> Self {
        Self::with_responder(move |_| {
            Err(AppError::Provider {
                kind: ProviderKind::Completion,
                message: "mock provider failure".to_string(),
                retryable,
            })
        })
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = (self.responder)(request)?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
