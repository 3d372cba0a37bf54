//! Error types for the recibo-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the recibo library.
///
/// Only recognition failures reach callers of the pipeline. Field-level
/// misses are `None` values and generative-service failures are absorbed
/// into [`crate::pipeline::AssistOutcome`].
#[derive(Error, Debug)]
pub enum ReciboError {
    /// The OCR engine could not produce text for the image.
    #[error("recognition unavailable: {0}")]
    Recognition(#[from] OcrError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The engine cannot recognize the requested language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Failures of a single generative-service call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistError {
    /// The call did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// The body was not the expected JSON structure.
    #[error("schema violation: {0}")]
    Schema(String),
}

impl AssistError {
    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        Self::Schema(reason.into())
    }
}

/// Result type for the recibo library.
pub type Result<T> = std::result::Result<T, ReciboError>;
