//! Error types surfaced by the client core.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The token exchange rejected the supplied credentials.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// The backend answered 401; the session has been cleared.
    #[error("session expired; please log in again")]
    Unauthorized,
    /// The backend rejected the request.
    #[error("request failed with status {status}: {detail}")]
    Api {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Flattened problem detail or response body.
        detail: String,
    },
    /// The request never produced a response.
    #[error("request to {endpoint} failed")]
    Transport {
        /// Endpoint path that was being called.
        endpoint: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// A response body did not match the expected schema.
    #[error("failed to decode response from {endpoint}")]
    Decode {
        /// Endpoint path that produced the body.
        endpoint: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// Input was rejected before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// The image could not be decoded, rendered, or encoded.
    #[error("image export failed: {0}")]
    Export(#[from] image::ImageError),
    /// The session store could not be read or written.
    #[error("session store '{}' unavailable", path.display())]
    Session {
        /// Backing file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The progress channel failed.
    #[error("progress channel error: {0}")]
    Channel(String),
    /// A URL could not be constructed.
    #[error(transparent)]
    Config(#[from] cloudgallery_config::ConfigError),
}

impl ClientError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error was raised before contacting the backend.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_mentions_status_and_detail() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            detail: "Image not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 404 Not Found: Image not found"
        );
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(ClientError::validation("no file selected").is_validation());
        assert!(!ClientError::Unauthorized.is_validation());
    }
}
