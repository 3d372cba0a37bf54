//! Operation identifier extraction.

use super::patterns::{ACCOUNT_ID_LABEL, DIGIT_RUN, OPERATION_ID_LABELED, OPERATION_LABEL};
use super::{ExtractionMatch, FieldExtractor};

/// Extracts the digit run that follows an operation label.
///
/// Digits that are not introduced by a label are never taken, so phone
/// numbers and account numbers elsewhere on the receipt are left alone.
pub struct OperationIdExtractor;

impl OperationIdExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Label followed by a digit run further along, possibly on a later line.
    ///
    /// Runs on a line that carries an account or tax identifier (CVU, CUIT,
    /// ...) are passed over.
    fn detached(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        OPERATION_LABEL
            .find_iter(text)
            .filter_map(|label| {
                let rest = &text[label.end()..];
                let digits = DIGIT_RUN
                    .find_iter(rest)
                    .find(|m| !ACCOUNT_ID_LABEL.is_match(line_around(rest, m.start(), m.end())))?;
                let start = label.end() + digits.start();
                Some(
                    ExtractionMatch::new(digits.as_str().to_string(), 0.7, digits.as_str())
                        .with_position(start, start + digits.len()),
                )
            })
            .collect()
    }
}

impl Default for OperationIdExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for OperationIdExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let labeled: Vec<_> = OPERATION_ID_LABELED
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let id = caps.get(1)?;
                Some(
                    ExtractionMatch::new(id.as_str().to_string(), 0.95, whole.as_str())
                        .with_position(id.start(), id.end()),
                )
            })
            .collect();

        if !labeled.is_empty() {
            return labeled;
        }

        self.detached(text)
    }
}

fn line_around(text: &str, start: usize, end: usize) -> &str {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
    &text[line_start..line_end]
}

/// Extract the operation identifier from receipt text.
pub fn parse_operation_id(text: &str) -> Option<String> {
    OperationIdExtractor::new().extract(text).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_with_platform_suffix() {
        assert_eq!(
            parse_operation_id("Número de operación de Mercado Pago 140076552211"),
            Some("140076552211".to_string())
        );
    }

    #[test]
    fn test_labeled_inline() {
        assert_eq!(
            parse_operation_id("Nro. de transacción: 98765432"),
            Some("98765432".to_string())
        );
        assert_eq!(
            parse_operation_id("Operación N° 1234567"),
            Some("1234567".to_string())
        );
    }

    #[test]
    fn test_label_on_previous_line() {
        let text = "Código de autorización\nAprobado\n00123456";
        assert_eq!(parse_operation_id(text), Some("00123456".to_string()));
    }

    #[test]
    fn test_label_without_digits() {
        assert_eq!(parse_operation_id("Número de operación"), None);
        assert_eq!(parse_operation_id("Número de operación 123"), None);
    }

    #[test]
    fn test_bare_labels() {
        for (text, id) in [
            ("Operación 140076552211", "140076552211"),
            ("Transacción: 12345678", "12345678"),
            ("Comprobante N° 12345678", "12345678"),
            ("ID Op: 12345678", "12345678"),
            ("ID de operación 140076552211", "140076552211"),
        ] {
            assert_eq!(parse_operation_id(text), Some(id.to_string()), "{text}");
        }
    }

    #[test]
    fn test_bare_label_without_digits_on_line() {
        assert_eq!(parse_operation_id("Operación exitosa\nTel 1144556677"), None);
        assert_eq!(parse_operation_id("Comprobante de transferencia\n$ 124.740"), None);
    }

    #[test]
    fn test_detached_label_skips_account_numbers() {
        let text = "Número de operación\nCVU 0000003100012345678901\nCUIT 27-12345678-4\n140076552211";
        let found = OperationIdExtractor::new().extract(text).unwrap();
        assert_eq!(found.value, "140076552211");
        assert_eq!(found.confidence, 0.7);
        let (start, end) = found.position.unwrap();
        assert_eq!(&text[start..end], "140076552211");
    }

    #[test]
    fn test_detached_label_only_account_numbers() {
        let text = "Número de operación\nCVU 0000003100012345678901";
        assert_eq!(parse_operation_id(text), None);
    }

    #[test]
    fn test_labeled_match_position() {
        let text = "Transferencia\nTransacción: 12345678";
        let found = OperationIdExtractor::new().extract(text).unwrap();
        assert_eq!(found.confidence, 0.95);
        assert_eq!(found.source, "Transacción: 12345678");
        let (start, end) = found.position.unwrap();
        assert_eq!(&text[start..end], "12345678");
    }

    #[test]
    fn test_unlabeled_digits_ignored() {
        assert_eq!(parse_operation_id("Tel 1144556677\nCVU 0000003100012345678901"), None);
    }
}
