//! Error types for the strato crate

use serde::Deserialize;
use thiserror::Error;

/// Result type for strato operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for strato operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service returned an error response
    #[error("API error: {status_code} {code}: {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Service-supplied error code
        code: String,
        /// Error message
        message: String,
    },

    /// Authentication or credential error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Please retry after {retry_after_secs} seconds")]
    RateLimit {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),
}

/// Error body shape used by the services: `{"code": "...", "message": "..."}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Normalize a non-success response into an [`Error`].
///
/// The services report failures as a JSON body carrying a `code` and a
/// `message`; when the body parses, those are lifted into a flat
/// [`Error::Api`]. Otherwise the raw body text is carried as the message
/// and the code falls back to the HTTP reason phrase.
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Auth("Invalid credentials".to_string());
    }

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            code: Some(code),
            message,
        }) => Error::Api {
            status_code: status.as_u16(),
            code,
            message: message.unwrap_or_default(),
        },
        _ => Error::Api {
            status_code: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("UnknownError")
                .to_string(),
            message: body.to_string(),
        },
    }
}
