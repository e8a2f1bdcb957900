//! Error types for the TEMPO services.

use thiserror::Error;

use crate::product::Product;

/// Result type alias using TempoError.
pub type TempoResult<T> = Result<T, TempoError>;

/// Primary error type for request processing.
#[derive(Debug, Error)]
pub enum TempoError {
    /// Malformed or out-of-range request input.
    #[error("{0}")]
    Validation(String),

    /// No granules for any product, or no product produced usable statistics.
    #[error("{0}")]
    NotFound(String),

    /// Catalog search/open/merge failure, scoped to one product.
    #[error("{product} upstream failure: {message}")]
    Upstream { product: Product, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Internal(String),
}

impl TempoError {
    pub fn validation(message: impl Into<String>) -> Self {
        TempoError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TempoError::NotFound(message.into())
    }

    pub fn upstream(product: Product, message: impl std::fmt::Display) -> Self {
        TempoError::Upstream {
            product,
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TempoError::Validation(_) => 400,
            TempoError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for TempoError {
    fn from(err: serde_json::Error) -> Self {
        TempoError::Internal(format!("JSON error: {}", err))
    }
}
