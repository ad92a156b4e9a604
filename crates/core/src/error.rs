//! Error types for the support desk.
//!
//! One enum covers every failure category the pipeline can observe:
//! configuration, the two knowledge sources, the synthesis boundary,
//! prompt rendering, I/O and serialization.

use thiserror::Error;

/// Unified error type for the support desk.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed configuration (bad YAML, unknown provider, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required configuration is absent (e.g. synthesis credentials).
    /// Fatal at startup; never raised per query.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Customer directory could not be reached or queried
    #[error("Customer directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Policy document index could not be reached or queried
    #[error("Document index unavailable: {0}")]
    IndexUnavailable(String),

    /// A record the caller asked for does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Answer synthesis failed at the transport or provider level
    #[error("Synthesis unavailable: {reason}")]
    SynthesisUnavailable { reason: String, transient: bool },

    /// Answer synthesis exceeded its deadline
    #[error("Synthesis timed out after {0:?}")]
    SynthesisTimeout(std::time::Duration),

    /// The caller abandoned the request
    #[error("Request cancelled")]
    Cancelled,

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a synthesis failure that is worth retrying.
    pub fn transient_synthesis(reason: impl Into<String>) -> Self {
        AppError::SynthesisUnavailable {
            reason: reason.into(),
            transient: true,
        }
    }

    /// Build a synthesis failure that retrying cannot fix (auth, bad request).
    pub fn fatal_synthesis(reason: impl Into<String>) -> Self {
        AppError::SynthesisUnavailable {
            reason: reason.into(),
            transient: false,
        }
    }

    /// Whether the synthesis boundary may retry after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::SynthesisTimeout(_) => true,
            AppError::SynthesisUnavailable { transient, .. } => *transient,
            _ => false,
        }
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
