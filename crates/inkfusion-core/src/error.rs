//! Error types for inkfusion-core

use thiserror::Error;

use crate::api::ApiError;
use crate::models::DraftKey;

/// Result type alias using inkfusion-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in inkfusion-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No draft with this key exists in the collection
    #[error("Draft not found: {0}")]
    DraftNotFound(DraftKey),

    /// Notes API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
