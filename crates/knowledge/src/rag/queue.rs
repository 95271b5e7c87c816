//! Bounded background answering.
//!
//! Questions submitted to the queue run on the tokio runtime with at most
//! `workers` answers in flight. Each submission returns a handle that can be
//! awaited or cancelled.

use super::pipeline::AnsweringPipeline;
use handbook_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct AnswerQueue {
    pipeline: Arc<AnsweringPipeline>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

/// Handle to one queued answer.
#[derive(Debug)]
pub struct AnswerHandle {
    result: oneshot::Receiver<AppResult<String>>,
    cancel: CancellationToken,
}

impl AnswerHandle {
    /// Wait for the answer text.
    pub async fn wait(self) -> AppResult<String> {
        self.result.await.unwrap_or(Err(AppError::Cancelled))
    }

    /// Abandon the request. A waiting caller receives `AppError::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl AnswerQueue {
    /// Must be called from within a tokio runtime.
    pub fn new(pipeline: Arc<AnsweringPipeline>, workers: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue a question and return a handle to its answer.
    pub fn submit(&self, question: impl Into<String>, role: Option<String>) -> AnswerHandle {
        let (tx, rx) = oneshot::channel();
        let cancel = self.shutdown.child_token();

        let question = question.into();
        let token = cancel.clone();
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => Err(AppError::Cancelled),
                text = async {
                    match permits.acquire_owned().await {
                        Ok(_permit) => Ok(pipeline.handle_question(&question, role.as_deref()).await),
                        Err(_) => Err(AppError::Cancelled),
                    }
                } => text,
            };

            if tx.send(outcome).is_err() {
                tracing::debug!("Answer receiver dropped before completion");
            }
        });

        AnswerHandle { result: rx, cancel }
    }

    /// Queue a question and deliver the answer text to `callback`.
    ///
    /// The callback is not invoked if the request is cancelled.
    pub fn submit_with_callback<F>(
        &self,
        question: impl Into<String>,
        role: Option<String>,
        callback: F,
    ) -> CancellationToken
    where
        F: FnOnce(String) + Send + 'static,
    {
        let handle = self.submit(question, role);
        let token = handle.cancel.clone();

        tokio::spawn(async move {
            match handle.wait().await {
                Ok(text) => callback(text),
                Err(e) => tracing::debug!(error = %e, "Queued answer not delivered"),
            }
        });

        token
    }

    /// Cancel every pending and running request.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
