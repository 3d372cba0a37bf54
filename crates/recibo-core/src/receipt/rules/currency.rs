//! Currency classification.

use super::patterns::{ARS_MARKERS, PYG_MARKERS};
use crate::models::Currency;

/// Classifies receipt text as Argentine pesos or Paraguayan guaraníes.
///
/// Guaraní markers are checked first: Paraguayan receipts routinely carry a
/// bare `$` as well.
pub struct CurrencyClassifier;

impl CurrencyClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Option<Currency> {
        if PYG_MARKERS.is_match(text) {
            Some(Currency::Pyg)
        } else if ARS_MARKERS.is_match(text) {
            Some(Currency::Ars)
        } else {
            None
        }
    }
}

impl Default for CurrencyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify the currency of receipt text.
pub fn classify_currency(text: &str) -> Option<Currency> {
    CurrencyClassifier::new().classify(text)
}
