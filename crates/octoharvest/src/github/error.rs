//! Error types for GitHub API operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Connection or timeout failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The API returned a non-2xx response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API returned 429 with a parseable reset header.
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// A 2xx body failed to decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for scrape operations.
pub type Result<T> = std::result::Result<T, GitHubError>;

/// Check if an error indicates rate limiting.
///
/// GitHub reports primary limits as 429 and secondary limits as 403, so
/// both classify as retryable here.
pub fn is_rate_limit_error(err: &GitHubError) -> bool {
    matches!(
        err,
        GitHubError::RateLimited { .. } | GitHubError::Api { status: 403 | 429, .. }
    )
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitHubError) -> String {
    match err {
        GitHubError::Network(_) => "network error".to_string(),
        GitHubError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        GitHubError::RateLimited { .. } => "rate limited".to_string(),
        GitHubError::Json(_) => "JSON parse error".to_string(),
        GitHubError::Config(msg) => format!("config: {msg}"),
        GitHubError::Internal(msg) => format!("internal: {msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_classification_covers_both_status_codes() {
        assert!(is_rate_limit_error(&GitHubError::RateLimited {
            reset_at: Utc::now(),
        }));
        assert!(is_rate_limit_error(&GitHubError::Api {
            status: 429,
            message: "too many requests".to_string(),
        }));
        assert!(is_rate_limit_error(&GitHubError::Api {
            status: 403,
            message: "secondary rate limit".to_string(),
        }));
        assert!(!is_rate_limit_error(&GitHubError::Api {
            status: 500,
            message: "server error".to_string(),
        }));
        assert!(!is_rate_limit_error(&GitHubError::Network(
            "connection refused".to_string()
        )));
    }

    #[test]
    fn short_error_message_truncates_long_api_bodies() {
        let err = GitHubError::Api {
            status: 422,
            message: "x".repeat(80),
        };
        let msg = short_error_message(&err);
        assert!(msg.starts_with("HTTP 422: "));
        assert!(msg.ends_with("..."));
        assert!(msg.chars().count() < 70);
    }

    #[test]
    fn short_error_message_keeps_short_api_bodies() {
        let err = GitHubError::Api {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(short_error_message(&err), "HTTP 404: Not Found");
    }

    #[test]
    fn error_display_includes_status() {
        let err = GitHubError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
