//! Error types for Handbook.
//!
//! A single error enum covers every failure category of the sync engine and the
//! answering pipeline. Per-item failures (`SourceRead`, `PathMetadata`) are
//! logged and skipped by their callers; provider failures carry a retryable flag.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which external capability produced a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Embedding,
    Index,
    Completion,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::Index => "vector index",
            Self::Completion => "completion",
        };
        f.write_str(name)
    }
}

/// Unified error type for Handbook.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single source document could not be read or parsed
    #[error("Failed to read source {path:?}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    /// A source path does not encode department and role
    #[error("Cannot derive metadata from path {path:?}: {reason}")]
    PathMetadata { path: PathBuf, reason: String },

    /// Embedding, index or completion provider failure
    #[error("{kind} provider error: {message}")]
    Provider {
        kind: ProviderKind,
        message: String,
        retryable: bool,
    },

    /// A bounded call did not finish in time
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// The manifest file exists but cannot be understood
    #[error("Manifest corrupted: {0}")]
    ManifestCorruption(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A queued request was cancelled before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a provider error that callers may retry.
    pub fn transient(kind: ProviderKind, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
            retryable: true,
        }
    }

    /// Build a provider error that will not succeed on retry.
    pub fn permanent(kind: ProviderKind, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether repeating the failed call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Per-item failures that a batch should skip rather than abort on.
    pub fn is_item_level(&self) -> bool {
        matches!(self, Self::SourceRead { .. } | Self::PathMetadata { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::transient(ProviderKind::Embedding, "503").is_retryable());
        assert!(!AppError::permanent(ProviderKind::Completion, "401").is_retryable());
        assert!(AppError::Timeout {
            operation: "search".to_string(),
            after: Duration::from_secs(1),
        }
        .is_retryable());
        assert!(!AppError::Config("missing".to_string()).is_retryable());
    }

    #[test]
    fn test_item_level_errors() {
        let err = AppError::PathMetadata {
            path: PathBuf::from("stray.pdf"),
            reason: "too shallow".to_string(),
        };
        assert!(err.is_item_level());
        assert!(!AppError::Cancelled.is_item_level());
    }

    #[test]
    fn test_display_includes_provider_kind() {
        let err = AppError::permanent(ProviderKind::Index, "collection missing");
        assert_eq!(
            err.to_string(),
            "vector index provider error: collection missing"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = AppError::Timeout {
            operation: "completion".to_string(),
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "completion timed out after 1500ms");
    }
}
