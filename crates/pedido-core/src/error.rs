//! Error types for the pedido-core library.
//!
//! Structural rejections (a CPF with the wrong digit count, a malformed money
//! token) are not errors: extractors return `None` and the value is dropped.

use thiserror::Error;

/// Main error type for the pedido library.
#[derive(Error, Debug)]
pub enum PedidoError {
    /// Upstream OCR failure; no extraction was attempted.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Record store failure that could not be attributed to a single write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by OCR providers.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load on-device OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The input bytes could not be decoded as an image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The provider answered with an error.
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// The provider could not be reached.
    #[error("provider {provider} unreachable: {message}")]
    Unreachable { provider: String, message: String },

    /// The provider returned no text.
    #[error("provider returned no text")]
    EmptyText,

    /// The cloud provider was selected without an API key.
    #[error("no API key configured for the cloud OCR provider")]
    MissingApiKey,

    /// The requested provider was compiled out.
    #[error("OCR provider '{0}' is not available in this build")]
    Unavailable(String),
}

/// Errors raised by record stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be opened or migrated.
    #[error("failed to open store: {0}")]
    Open(String),

    /// A statement was rejected by the store.
    #[error("query failed: {0}")]
    Query(String),

    /// A value could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Result type for the pedido library.
pub type Result<T> = std::result::Result<T, PedidoError>;
