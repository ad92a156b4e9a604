//! Concrete LLM providers.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use support_core::AppError;

/// Classify an HTTP error status from a provider.
///
/// Throttling and server-side failures may clear up on retry; auth and
/// request errors will not.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    let reason = format!("{} API error ({}): {}", provider, status, body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AppError::transient_synthesis(reason)
    } else {
        AppError::fatal_synthesis(reason)
    }
}

/// Classify a transport error from reqwest.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::transient_synthesis(format!("{} request timed out: {}", provider, err))
    } else if err.is_connect() || err.is_request() {
        AppError::transient_synthesis(format!("Failed to reach {}: {}", provider, err))
    } else {
        AppError::fatal_synthesis(format!("{} request failed: {}", provider, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert!(status_error("gemini", StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(status_error("gemini", StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(!status_error("gemini", StatusCode::UNAUTHORIZED, "").is_transient());
        assert!(!status_error("gemini", StatusCode::BAD_REQUEST, "").is_transient());
    }
}
