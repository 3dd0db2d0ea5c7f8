use axum::http::StatusCode;
use thiserror::Error;

/// Error type shared by the remittance service.
#[derive(Debug, Error)]
pub enum BorderHopError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Request validation errors.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Resource not found errors.
    #[error("Not found: {0}")]
    NotFoundError(String),
    /// Duplicate records and refused status transitions.
    #[error("Conflict: {0}")]
    ConflictError(String),
    /// Storage-related errors.
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Circle CCTP API errors.
    #[error("Circle API error: {0}")]
    CircleError(String),
    /// Webhook authentication errors.
    #[error("Webhook signature error: {0}")]
    SignatureError(String),
    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Internal errors.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BorderHopError {
    /// HTTP status the error maps to at the handler boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BorderHopError::ValidationError(_) | BorderHopError::SerializationError(_) => {
                StatusCode::BAD_REQUEST
            }
            BorderHopError::NotFoundError(_) => StatusCode::NOT_FOUND,
            BorderHopError::ConflictError(_) => StatusCode::CONFLICT,
            BorderHopError::SignatureError(_) => StatusCode::UNAUTHORIZED,
            BorderHopError::CircleError(_) => StatusCode::BAD_GATEWAY,
            BorderHopError::ConfigError(_)
            | BorderHopError::StorageError(_)
            | BorderHopError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BorderHopError::ConfigError(_) => "CONFIG_ERROR",
            BorderHopError::ValidationError(_) => "INVALID_INPUT",
            BorderHopError::NotFoundError(_) => "NOT_FOUND",
            BorderHopError::ConflictError(_) => "CONFLICT",
            BorderHopError::StorageError(_) => "STORAGE_ERROR",
            BorderHopError::CircleError(_) => "CIRCLE_API_ERROR",
            BorderHopError::SignatureError(_) => "INVALID_SIGNATURE",
            BorderHopError::SerializationError(_) => "SERIALIZATION_ERROR",
            BorderHopError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors worth retrying against another backend.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BorderHopError::StorageError(_) | BorderHopError::CircleError(_))
    }
}

impl From<anyhow::Error> for BorderHopError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BorderHopError>() {
            Ok(inner) => inner,
            Err(other) => BorderHopError::InternalError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for BorderHopError {
    fn from(err: sqlx::Error) -> Self {
        BorderHopError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for BorderHopError {
    fn from(err: serde_json::Error) -> Self {
        BorderHopError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for BorderHopError {
    fn from(err: reqwest::Error) -> Self {
        BorderHopError::CircleError(err.to_string())
    }
}
