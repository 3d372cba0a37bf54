//! Amount extraction with locale disambiguation.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{BARE_AMOUNT, MARKED_AMOUNT};
use super::{ExtractionMatch, FieldExtractor};

/// Amount field extractor.
///
/// Candidates preceded by a currency marker win over bare numeric runs;
/// the largest candidate is taken as the total.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text)
            .into_iter()
            .max_by(|a, b| a.value.cmp(&b.value))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let marked = collect_candidates(&MARKED_AMOUNT, text, 0.95);
        if !marked.is_empty() {
            return marked;
        }

        collect_candidates(&BARE_AMOUNT, text, 0.6)
    }
}

fn collect_candidates(pattern: &Regex, text: &str, confidence: f32) -> Vec<ExtractionMatch<Decimal>> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            // Sentence punctuation after the number is not part of it.
            let raw = m.as_str().trim_end_matches(['.', ',']);
            let value = parse_localized_number(raw)?;
            (value > Decimal::ZERO).then(|| {
                ExtractionMatch::new(value, confidence, raw)
                    .with_position(m.start(), m.start() + raw.len())
            })
        })
        .collect()
}

/// Extract the paid amount from receipt text.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new().extract(text).map(|m| m.value)
}

/// Parse a number written with `.`/`,` in either locale.
///
/// With both separators present the one occurring last is the decimal
/// separator (`1.234,56` and `1,234.56` are both 1234.56). A lone separator
/// sitting on 3-digit group boundaries is a thousands separator
/// (`124.740` is 124740); otherwise it is the decimal separator.
pub fn parse_localized_number(s: &str) -> Option<Decimal> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty()
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let canonical = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            if cleaned.matches(decimal).count() != 1 {
                return None;
            }
            cleaned.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => resolve_single_separator(&cleaned, '.')?,
        (None, Some(_)) => resolve_single_separator(&cleaned, ',')?,
        (None, None) => cleaned,
    };

    Decimal::from_str(&canonical).ok()
}

fn resolve_single_separator(s: &str, separator: char) -> Option<String> {
    let groups: Vec<&str> = s.split(separator).collect();
    if groups.iter().any(|g| g.is_empty()) {
        return None;
    }

    let head = groups[0];
    let thousands = head.len() <= 3
        && !head.starts_with('0')
        && groups[1..].iter().all(|g| g.len() == 3);

    if thousands {
        Some(groups.concat())
    } else if groups.len() == 2 {
        Some(format!("{}.{}", groups[0], groups[1]))
    } else {
        None
    }
}
