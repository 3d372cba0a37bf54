//! Rule-based field extractors for payment receipts.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod operation;
pub mod parties;
pub mod patterns;

pub use amounts::{parse_amount, parse_localized_number, AmountExtractor};
pub use currency::{classify_currency, CurrencyClassifier};
pub use dates::{parse_date, DateExtractor};
pub use operation::{parse_operation_id, OperationIdExtractor};
pub use parties::{extract_parties, PartyExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all candidate occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A candidate value with its confidence and location.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte range in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
