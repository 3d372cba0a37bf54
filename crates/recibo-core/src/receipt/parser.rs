//! Rule-based receipt parser.

use std::time::Instant;

use tracing::{debug, info};

use crate::models::{ExtractedRecord, Provenance};

use super::rules::{
    AmountExtractor, CurrencyClassifier, DateExtractor, ExtractionMatch, FieldExtractor,
    OperationIdExtractor, PartyExtractor,
};

/// Trait for receipt parsing.
pub trait ReceiptParser: Send + Sync {
    /// Parse a record from normalized text.
    fn parse(&self, text: &str) -> ExtractedRecord;
}

/// Runs every field extractor over the text.
///
/// Missing fields stay `None`; nothing is defaulted.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedParser {
    parties: PartyExtractor,
}

impl RuleBasedParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set payment-platform names that are never a party.
    pub fn with_platform_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parties = self.parties.with_platform_brands(brands);
        self
    }
}

impl ReceiptParser for RuleBasedParser {
    fn parse(&self, text: &str) -> ExtractedRecord {
        let start = Instant::now();
        debug!("Parsing receipt from {} characters of text", text.len());

        let (emitter, recipient) = self.parties.extract(text);

        let record = ExtractedRecord {
            emitter,
            recipient,
            amount: accept("amount", AmountExtractor::new().extract(text)),
            currency: CurrencyClassifier::new().classify(text),
            date: accept("date", DateExtractor::new().extract(text)),
            operation_id: accept("operation_id", OperationIdExtractor::new().extract(text)),
            raw_text: text.to_string(),
            provenance: Provenance::RuleBased,
        };

        let missing = record.missing_fields();
        if !missing.is_empty() {
            debug!("Fields not found by rules: {}", missing.join(", "));
        }

        info!(
            "Rule-based parse finished in {}ms ({} of 6 fields)",
            start.elapsed().as_millis(),
            6 - missing.len()
        );

        record
    }
}

fn accept<T: std::fmt::Debug>(field: &str, found: Option<ExtractionMatch<T>>) -> Option<T> {
    let found = found?;
    debug!(
        "{}: {:?} from {:?} at {:?} (confidence {:.2})",
        field, found.value, found.source, found.position, found.confidence
    );
    Some(found.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const MERCADO_PAGO: &str = "Comprobante de transferencia
Lunes, 05 de enero de 2026 a las
$ 124.740
De
Sandra Gabriela Diaz
CUIT: 27-12345678-4
Mercado Pago
Para
Romina Lopez
CVU: 0000003100012345678901
Número de operación de Mercado Pago 140076552211";

    #[test]
    fn test_parse_full_receipt() {
        let record = RuleBasedParser::new().parse(MERCADO_PAGO);

        assert_eq!(record.emitter.as_deref(), Some("Sandra Gabriela Diaz"));
        assert_eq!(record.recipient.as_deref(), Some("Romina Lopez"));
        assert_eq!(record.amount, Some(Decimal::from(124740)));
        assert_eq!(record.currency, Some(Currency::Ars));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 1, 5));
        assert_eq!(record.operation_id.as_deref(), Some("140076552211"));
        assert_eq!(record.provenance, Provenance::RuleBased);
        assert_eq!(record.raw_text, MERCADO_PAGO);
        assert!(record.missing_fields().is_empty());
    }

    #[test]
    fn test_parse_leaves_unknown_fields_empty() {
        let record = RuleBasedParser::new().parse("Gs. 150.000");

        assert_eq!(record.amount, Some(Decimal::from(150000)));
        assert_eq!(record.currency, Some(Currency::Pyg));
        assert_eq!(record.emitter, None);
        assert_eq!(record.date, None);
        assert_eq!(record.operation_id, None);
    }

    #[test]
    fn test_parse_empty_text() {
        let record = RuleBasedParser::new().parse("");
        assert_eq!(record, ExtractedRecord::new(""));
    }
}
