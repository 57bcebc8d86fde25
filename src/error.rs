use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Main error type for Galyn
#[derive(Error, Debug)]
pub enum GalynError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// SPARQL store errors (network, HTTP status, result decoding)
    #[error("SPARQL store error: {0}")]
    Sparql(String),

    /// Invalid request input; the message is shown to the client as-is
    #[error("{0}")]
    InvalidInput(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Background task failures
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GalynError {
    /// HTTP status used when this error reaches a request handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            GalynError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GalynError::NotFound(_) => StatusCode::NOT_FOUND,
            GalynError::Sparql(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GalynError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Plain text body for bad requests
            GalynError::InvalidInput(msg) => (status, msg).into_response(),
            other => {
                log::error!("Request failed: {}", other);
                (
                    status,
                    Json(serde_json::json!({ "error": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// Convenient Result type using GalynError
pub type Result<T> = std::result::Result<T, GalynError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GalynError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let galyn_err: GalynError = rusqlite_err.into();
        assert!(matches!(galyn_err, GalynError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let galyn_err: GalynError = io_err.into();
        assert!(matches!(galyn_err, GalynError::Io(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GalynError::InvalidInput("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GalynError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GalynError::Sparql("down".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GalynError::Database(rusqlite::Error::InvalidQuery).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_input_message_is_verbatim() {
        let err = GalynError::InvalidInput("missing participant".to_string());
        assert_eq!(err.to_string(), "missing participant");
    }
}
