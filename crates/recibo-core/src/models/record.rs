//! Receipt data models: the extracted record and the generative-service guess.

use std::fmt;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currencies recognized on receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Argentine peso.
    #[serde(rename = "ARS")]
    Ars,
    /// Paraguayan guaraní.
    #[serde(rename = "PYG")]
    Pyg,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ars => "ARS",
            Self::Pyg => "PYG",
        }
    }

    /// Parse an ISO code, ignoring case and surrounding whitespace.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARS" => Some(Self::Ars),
            "PYG" => Some(Self::Pyg),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where the final field set came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Local heuristics only.
    #[default]
    RuleBased,
    /// Rule-based baseline adjusted by the generative service.
    LlmAssisted,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleBased => f.write_str("rule_based"),
            Self::LlmAssisted => f.write_str("llm_assisted"),
        }
    }
}

/// Structured record extracted from one receipt.
///
/// Every field is independently optional; a field the text cannot justify
/// stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Payer.
    pub emitter: Option<String>,

    /// Payee.
    pub recipient: Option<String>,

    /// Paid amount (never negative).
    pub amount: Option<Decimal>,

    /// Currency of the amount.
    pub currency: Option<Currency>,

    /// Operation date, serialized as `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,

    /// Operation/transaction identifier (digits only).
    pub operation_id: Option<String>,

    /// Normalized recognized text, kept for audit.
    pub raw_text: String,

    /// Source of the field set.
    pub provenance: Provenance,
}

impl ExtractedRecord {
    /// Empty rule-based record over the given normalized text.
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    /// Overlay a structured guess on this record.
    ///
    /// Each non-null guess field replaces the baseline field; null guess
    /// fields keep the baseline value. The result is tagged `llm_assisted`.
    pub fn merged_with(&self, guess: &StructuredGuess) -> Self {
        Self {
            emitter: guess.emitter.clone().or_else(|| self.emitter.clone()),
            recipient: guess.recipient.clone().or_else(|| self.recipient.clone()),
            amount: guess.amount.or(self.amount),
            currency: guess.currency.or(self.currency),
            date: guess.date.or(self.date),
            operation_id: guess
                .operation_id
                .clone()
                .or_else(|| self.operation_id.clone()),
            raw_text: self.raw_text.clone(),
            provenance: Provenance::LlmAssisted,
        }
    }

    /// Names of the fields that could not be extracted.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.emitter.is_none() {
            missing.push("emitter");
        }
        if self.recipient.is_none() {
            missing.push("recipient");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.currency.is_none() {
            missing.push("currency");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.operation_id.is_none() {
            missing.push("operation_id");
        }
        missing
    }

    /// Audit JSON stored next to a processed receipt.
    pub fn summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "emitter": self.emitter,
            "recipient": self.recipient,
            "amount": self.amount.map(|a| a.normalize().to_string()),
            "currency": self.currency,
            "date": self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            "operation_id": self.operation_id,
            "source": self.provenance,
            "extracted_at": Utc::now().to_rfc3339(),
        })
    }
}

/// Sparse, already-validated guess returned by the generative service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredGuess {
    pub emitter: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub date: Option<NaiveDate>,
    pub operation_id: Option<String>,
}

impl StructuredGuess {
    /// True when the guess carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.emitter.is_none()
            && self.recipient.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.operation_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code(" pyg "), Some(Currency::Pyg));
        assert_eq!(Currency::from_code("ARS"), Some(Currency::Ars));
        assert_eq!(Currency::from_code("USD"), None);
        assert_eq!(Currency::Pyg.to_string(), "PYG");
    }

    #[test]
    fn test_merge_prefers_non_null_guess_fields() {
        let mut baseline = ExtractedRecord::new("texto");
        baseline.amount = Some(Decimal::from(100));
        baseline.currency = Some(Currency::Ars);
        baseline.emitter = Some("Sandra Gabriela Diaz".to_string());

        let guess = StructuredGuess {
            currency: Some(Currency::Pyg),
            ..StructuredGuess::default()
        };

        let merged = baseline.merged_with(&guess);

        assert_eq!(merged.amount, Some(Decimal::from(100)));
        assert_eq!(merged.currency, Some(Currency::Pyg));
        assert_eq!(merged.emitter.as_deref(), Some("Sandra Gabriela Diaz"));
        assert_eq!(merged.raw_text, "texto");
        assert_eq!(merged.provenance, Provenance::LlmAssisted);
    }

    #[test]
    fn test_serialized_shape() {
        let mut record = ExtractedRecord::new("x");
        record.date = NaiveDate::from_ymd_opt(2026, 1, 5);
        record.currency = Some(Currency::Pyg);

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["date"], "2026-01-05");
        assert_eq!(json["currency"], "PYG");
        assert_eq!(json["provenance"], "rule_based");
        assert!(json["emitter"].is_null());
    }

    #[test]
    fn test_missing_fields() {
        let mut record = ExtractedRecord::new("");
        record.amount = Some(Decimal::ONE);
        assert_eq!(
            record.missing_fields(),
            vec!["emitter", "recipient", "currency", "date", "operation_id"]
        );
    }

    #[test]
    fn test_summary_json_tags_source() {
        let mut record = ExtractedRecord::new("");
        record.provenance = Provenance::LlmAssisted;
        let summary = record.summary_json();
        assert_eq!(summary["source"], "llm_assisted");
        assert!(summary["extracted_at"].is_string());
    }
}
