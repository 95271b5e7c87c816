//! Handbook Core Library
//!
//! Foundational utilities shared by every Handbook crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Timeout and retry helpers for external calls

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ProviderKind};
pub use retry::{bounded_call, retry_async, with_timeout, RetryPolicy};
