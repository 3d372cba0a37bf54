//! Common regex patterns for Spanish-language payment receipts.

use lazy_static::lazy_static;
use regex::Regex;

/// Label phrases that introduce an operation identifier.
const OPERATION_LABEL_SRC: &str = r"(?:\b(?:n[úu]mero|nro\.?|n[°º]|id|c[óo]digo)\s*(?:de\s+(?:la\s+)?)?(?:operaci[óo]n|transacci[óo]n|transferencia|autorizaci[óo]n)|\b(?:operaci[óo]n|transacci[óo]n|autorizaci[óo]n)\s*(?:n[°º]|nro\.?|#))";

/// Bare labels that only count when the digits follow on the same line.
const BARE_OPERATION_LABEL_SRC: &str = r"\b(?:operaci[óo]n|transacci[óo]n|comprobante|autorizaci[óo]n|id[ \t]*op\b\.?)(?:[ \t]*(?:n[°º]|nro\.?|#))?[ \t:#\-]*";

lazy_static! {
    // Clock times ("9:41", "10:32hs", "18:05:12")
    pub static ref TIME_TOKEN: Regex = Regex::new(
        r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?(?:\s*(?:hs|h|am|pm))?\b"
    ).unwrap();

    // Horizontal whitespace runs
    pub static ref INLINE_WHITESPACE: Regex = Regex::new(
        r"[^\S\n]+"
    ).unwrap();

    // OCR renderings of tax-ID labels
    pub static ref CUIT_GARBLED: Regex = Regex::new(
        r"(?i)\bC\.?\s?U\.?\s?[I1L|!]\.?\s?[T7]\b\.*"
    ).unwrap();

    pub static ref CUIL_GARBLED: Regex = Regex::new(
        r"(?i)\bC\.?\s?U\.?\s?[I1l|!]\.?\s?L\b\.*"
    ).unwrap();

    pub static ref RUC_DOTTED: Regex = Regex::new(
        r"(?i)\bR\.\s?U\.\s?C\b\.*"
    ).unwrap();

    // Amounts preceded by a currency marker ("$ 124.740", "Gs. 150.000", "₲ 80.000")
    pub static ref MARKED_AMOUNT: Regex = Regex::new(
        r"(?i)(?:\$|₲|\bGs\.?|\bARS|\bPYG)\s*(\d[\d.,]*)"
    ).unwrap();

    // Numeric runs with grouping or decimal punctuation
    pub static ref BARE_AMOUNT: Regex = Regex::new(
        r"(\d+(?:[.,]\d+)+)"
    ).unwrap();

    // "5 de enero de 2026"
    pub static ref DATE_SPANISH_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\s+del?\s+(\d{4})\b"
    ).unwrap();

    // Operation identifiers
    pub static ref OPERATION_LABEL: Regex = Regex::new(&format!("(?i){}", OPERATION_LABEL_SRC)).unwrap();

    pub static ref OPERATION_ID_LABELED: Regex = Regex::new(&format!(
        r"(?i)(?:{}(?:\s+de\s+\p{{L}}+(?:\s+\p{{L}}+)?)?[\s:#\-]*|{})(\d{{6,}})",
        OPERATION_LABEL_SRC, BARE_OPERATION_LABEL_SRC
    )).unwrap();

    // Account and tax identifiers whose digits are never an operation id
    pub static ref ACCOUNT_ID_LABEL: Regex = Regex::new(
        r"(?i)\b(?:CUIT|CUIL|RUC|DNI|CVU|CBU)\b"
    ).unwrap();

    pub static ref DIGIT_RUN: Regex = Regex::new(
        r"\d{6,}"
    ).unwrap();

    // Currency keywords
    pub static ref PYG_MARKERS: Regex = Regex::new(
        r"(?i)₲|\bPYG\b|\bguaran[íi](?:es)?\b|\bGs\b|\btigo\s+money\b|\bbilletera\s+personal\b|\bzimple\b|\bueno\b|\bbancard\b"
    ).unwrap();

    pub static ref ARS_MARKERS: Regex = Regex::new(
        r"(?i)\$|\bARS\b|\bpesos?\b"
    ).unwrap();

    // Party labels on their own line or followed by the name
    pub static ref PARTY_LABEL: Regex = Regex::new(
        r"^(De|DE|Para|PARA)\b\s*:?\s*(.*)$"
    ).unwrap();

    // Identifier metadata that is never part of a person's name
    pub static ref BANKING_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(?:CUIT|CUIL|RUC|DNI|CVU|CBU|alias|banco|bank|mercado\s+pago|ual[áa]|brubank|naranja\s*x|tigo\s+money|billetera\s+personal|zimple|ueno|bancard)\b"
    ).unwrap();

    // "Sandra Diaz ... CUIT: 27-12345678-4"
    pub static ref NAME_WITH_TAX_ID: Regex = Regex::new(
        r"^(\p{Lu}[\p{L}'.]*(?:\s+\p{Lu}[\p{L}'.]*)+).*?\b(?:CUIT|CUIL|RUC|DNI)\b[\s:.]*\d+(?:[.\-]\d+)+"
    ).unwrap();
}
