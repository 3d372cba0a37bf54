//! Data models and configuration.

pub mod config;
pub mod record;

pub use config::ReciboConfig;
pub use record::{Currency, ExtractedRecord, Provenance, StructuredGuess};
