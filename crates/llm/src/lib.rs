//! Completion model integration for Handbook.
//!
//! A provider-agnostic `LlmClient` trait with OpenAI and Ollama
//! implementations. Failures surface as typed `AppError::Provider` or
//! `AppError::Timeout` values so callers can decide whether to retry.
//!
//! # Example
//! ```no_run
//! use handbook_llm::{LlmClient, LlmRequest, OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_temperature(0.1);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod http;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;

#[cfg(any(test, feature = "mock"))]
pub use providers::MockLlmClient;
