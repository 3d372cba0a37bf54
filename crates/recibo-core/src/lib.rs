//! Core library for payment receipt OCR.
//!
//! This crate provides:
//! - Normalization of recognized receipt text
//! - Rule-based extraction of parties, amount, currency, date and operation ID
//!   from Argentine and Paraguayan transfer receipts
//! - A fingerprint-keyed FIFO cache of recognized text
//! - Optional merging with a structured guess from a generative text service

pub mod assist;
pub mod cache;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod receipt;

pub use assist::{AssistService, build_prompt, parse_guess};
pub use cache::{Fingerprint, OcrCache};
pub use error::{AssistError, OcrError, ReciboError, Result};
pub use models::{Currency, ExtractedRecord, Provenance, ReciboConfig, StructuredGuess};
pub use ocr::{RawRecognizedText, TextRecognizer, TextSegment};
pub use pipeline::{AssistOutcome, Extraction, ExtractionPipeline, PipelineBuilder};
pub use receipt::rules::{
    classify_currency, extract_parties, parse_amount, parse_date, parse_operation_id,
};
pub use receipt::{normalize, ReceiptParser, RuleBasedParser};

#[cfg(feature = "native")]
pub use assist::GeminiClient;
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
