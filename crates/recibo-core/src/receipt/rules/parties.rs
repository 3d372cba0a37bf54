//! Emitter and recipient extraction.

use super::patterns::{BANKING_KEYWORDS, NAME_WITH_TAX_ID, PARTY_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Emitter,
    Recipient,
}

/// Finds the paying and receiving parties on a transfer receipt.
///
/// Labeled rows ("De" / "Para") are read first. Only when neither party is
/// found that way are rows of the form `Name ... CUIT 20-12345678-9`
/// considered, in document order.
#[derive(Debug, Clone)]
pub struct PartyExtractor {
    platform_brands: Vec<String>,
}

impl PartyExtractor {
    pub fn new() -> Self {
        Self {
            platform_brands: vec!["Mercado Pago".to_string()],
        }
    }

    /// Replace the list of payment-platform names that are never a party.
    pub fn with_platform_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platform_brands = brands.into_iter().map(Into::into).collect();
        self
    }

    /// Extract `(emitter, recipient)`.
    pub fn extract(&self, text: &str) -> (Option<String>, Option<String>) {
        let labeled = self.from_labels(text);
        if labeled.0.is_some() || labeled.1.is_some() {
            return labeled;
        }

        self.from_tax_id_rows(text)
    }

    fn from_labels(&self, text: &str) -> (Option<String>, Option<String>) {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let mut emitter = None;
        let mut recipient = None;

        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = PARTY_LABEL.captures(line) else {
                continue;
            };

            let role = match caps.get(1).map(|m| m.as_str()) {
                Some("De") | Some("DE") => Role::Emitter,
                _ => Role::Recipient,
            };

            let slot = match role {
                Role::Emitter => &mut emitter,
                Role::Recipient => &mut recipient,
            };
            if slot.is_some() {
                continue;
            }

            let inline = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            let value = if inline.is_empty() {
                lines[idx + 1..].iter().copied().find(|l| !l.is_empty())
            } else {
                Some(inline).filter(|v| looks_like_name(v))
            };

            if let Some(name) = value.filter(|v| self.qualifies(v)) {
                *slot = Some(name.to_string());
            }
        }

        (emitter, recipient)
    }

    fn from_tax_id_rows(&self, text: &str) -> (Option<String>, Option<String>) {
        let mut names = text
            .lines()
            .map(str::trim)
            .filter_map(|line| NAME_WITH_TAX_ID.captures(line))
            .filter_map(|caps| caps.get(1).map(|m| strip_role_prefix(m.as_str().trim())))
            .map(cut_at_identifier)
            .filter(|name| name.split_whitespace().count() >= 2 && !self.is_platform(name))
            .map(str::to_string);

        (names.next(), names.next())
    }

    fn qualifies(&self, candidate: &str) -> bool {
        candidate.split_whitespace().count() >= 2
            && !candidate.chars().any(|c| c.is_ascii_digit())
            && !BANKING_KEYWORDS.is_match(candidate)
            && !self.is_platform(candidate)
    }

    fn is_platform(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.platform_brands
            .iter()
            .any(|brand| lowered.contains(&brand.to_lowercase()))
    }
}

impl Default for PartyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Particles allowed in lowercase inside a personal name.
const NAME_PARTICLES: [&str; 7] = ["de", "del", "la", "las", "los", "y", "e"];

/// Text after an inline label must read as a name, not as a sentence
/// ("Para más información ...").
fn looks_like_name(candidate: &str) -> bool {
    candidate.split_whitespace().enumerate().all(|(i, token)| {
        let capitalized = token.chars().next().is_some_and(char::is_uppercase);
        capitalized || (i > 0 && NAME_PARTICLES.contains(&token))
    })
}

/// Drop everything from the first identifier keyword on ("Sandra Diaz DNI ...").
fn cut_at_identifier(name: &str) -> &str {
    BANKING_KEYWORDS
        .find(name)
        .map_or(name, |m| name[..m.start()].trim_end())
}

fn strip_role_prefix(name: &str) -> &str {
    ["De ", "DE ", "Para ", "PARA "]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .map(str::trim_start)
        .unwrap_or(name)
}

/// Extract `(emitter, recipient)` with the default platform brands.
pub fn extract_parties(text: &str) -> (Option<String>, Option<String>) {
    PartyExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_labels_on_own_line() {
        let text = "Comprobante de transferencia\nDe\nSandra Gabriela Diaz\nCUIT: 27-12345678-4\nPara\nRomina Lopez\nCVU 0000003100012345678901";
        assert_eq!(
            extract_parties(text),
            (some("Sandra Gabriela Diaz"), some("Romina Lopez"))
        );
    }

    #[test]
    fn test_inline_labels() {
        let text = "De: Juan Carlos Perez\nPara: Maria Fernanda Gomez";
        assert_eq!(
            extract_parties(text),
            (some("Juan Carlos Perez"), some("Maria Fernanda Gomez"))
        );
    }

    #[test]
    fn test_rejects_identifier_rows() {
        let text = "De\nCUIT 27-12345678-4\nPara\nRomina Lopez";
        assert_eq!(extract_parties(text), (None, some("Romina Lopez")));
    }

    #[test]
    fn test_rejects_single_token_and_platform() {
        let text = "De\nSandra\nPara\nMercado Pago";
        assert_eq!(extract_parties(text), (None, None));
    }

    #[test]
    fn test_first_qualifying_label_wins() {
        let text = "De\nAna Maria Ruiz\nDe\nOtro Nombre Distinto\nPara\nLuis Alberto Sosa";
        assert_eq!(
            extract_parties(text),
            (some("Ana Maria Ruiz"), some("Luis Alberto Sosa"))
        );
    }

    #[test]
    fn test_tax_id_rows_fallback() {
        let text = "Transferencia realizada\nSandra Gabriela Diaz CUIT: 27-12345678-4\nRomina Lopez CUIL 23-87654321-9";
        assert_eq!(
            extract_parties(text),
            (some("Sandra Gabriela Diaz"), some("Romina Lopez"))
        );
    }

    #[test]
    fn test_tax_id_rows_skip_platform() {
        let text = "Mercado Pago CUIT 30-70308853-4\nRomina Lopez RUC 4567890-1";
        assert_eq!(extract_parties(text), (some("Romina Lopez"), None));
    }

    #[test]
    fn test_custom_platform_brands() {
        let extractor = PartyExtractor::new().with_platform_brands(["Tigo Money", "Ueno Bank"]);
        let text = "De\nUeno Bank Paraguay\nPara\nCarlos Benitez";
        assert_eq!(extractor.extract(text), (None, some("Carlos Benitez")));
    }

    #[test]
    fn test_inline_prose_is_not_a_party() {
        let text = "Para más información ingresá a la app\nDe nada sirve reclamar";
        assert_eq!(extract_parties(text), (None, None));
    }

    #[test]
    fn test_inline_name_with_particles() {
        let text = "Para María de los Ángeles Benítez";
        assert_eq!(
            extract_parties(text),
            (None, some("María de los Ángeles Benítez"))
        );
    }

    #[test]
    fn test_tax_id_rows_stop_at_identifier_keyword() {
        let text = "Sandra Diaz DNI 12.345.678 CUIT 27-12345678-4";
        assert_eq!(extract_parties(text), (some("Sandra Diaz"), None));
    }

    #[test]
    fn test_tax_id_rows_need_two_tokens() {
        let text = "Sandra CUIT 27-12345678-4\nRomina Lopez CUIL 23-87654321-9";
        assert_eq!(extract_parties(text), (some("Romina Lopez"), None));
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(extract_parties("Transferencia enviada\n$ 1.500"), (None, None));
    }
}
