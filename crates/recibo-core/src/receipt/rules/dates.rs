//! Spanish long-form date extraction.

use chrono::NaiveDate;

use super::patterns::DATE_SPANISH_LONG;
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor for "05 de enero de 2026" style dates.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    fn month_number(name: &str) -> Option<u32> {
        let month = match name.to_lowercase().as_str() {
            "enero" => 1,
            "febrero" => 2,
            "marzo" => 3,
            "abril" => 4,
            "mayo" => 5,
            "junio" => 6,
            "julio" => 7,
            "agosto" => 8,
            "septiembre" | "setiembre" => 9,
            "octubre" => 10,
            "noviembre" => 11,
            "diciembre" => 12,
            _ => return None,
        };
        Some(month)
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_SPANISH_LONG
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let day: u32 = caps.get(1)?.as_str().parse().ok()?;
                let month = Self::month_number(caps.get(2)?.as_str())?;
                let year: i32 = caps.get(3)?.as_str().parse().ok()?;

                // "31 de febrero" and friends are skipped, not clamped.
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                Some(
                    ExtractionMatch::new(date, 0.9, whole.as_str())
                        .with_position(whole.start(), whole.end()),
                )
            })
            .collect()
    }
}

/// Extract the first valid long-form date from text.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_long_date() {
        assert_eq!(
            parse_date("Lunes, 05 de enero de 2026 a las 10:32hs"),
            Some(ymd(2026, 1, 5))
        );
        assert_eq!(
            parse_date("5 de enero de 2026").map(|d| d.to_string()),
            Some("2026-01-05".to_string())
        );
    }

    #[test]
    fn test_month_names_case_insensitive() {
        assert_eq!(parse_date("12 DE MARZO DE 2025"), Some(ymd(2025, 3, 12)));
        assert_eq!(parse_date("1 de Setiembre del 2024"), Some(ymd(2024, 9, 1)));
        assert_eq!(parse_date("30 de septiembre de 2024"), Some(ymd(2024, 9, 30)));
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        assert_eq!(parse_date("31 de febrero de 2026"), None);
        assert_eq!(
            parse_date("31 de febrero de 2026\n2 de marzo de 2026"),
            Some(ymd(2026, 3, 2))
        );
    }

    #[test]
    fn test_no_date() {
        assert_eq!(parse_date("Transferencia enviada"), None);
        assert_eq!(parse_date("05/01/2026"), None);
    }
}
