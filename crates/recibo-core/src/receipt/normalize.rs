//! Cleanup of recognized text before field extraction.

use super::rules::patterns::{CUIL_GARBLED, CUIT_GARBLED, INLINE_WHITESPACE, RUC_DOTTED, TIME_TOKEN};

/// Normalize recognized text.
///
/// Clock times are removed, runs of horizontal whitespace collapse to one
/// space, lines left empty are dropped and garbled tax-ID labels are
/// rewritten to `CUIT`, `CUIL` or `RUC`. Line breaks are kept. The function
/// is idempotent.
pub fn normalize(raw: &str) -> String {
    raw.lines()
        .filter_map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> Option<String> {
    // Times go first so their removal cannot glue label fragments together.
    let without_times = TIME_TOKEN.replace_all(line, " ");
    let collapsed = INLINE_WHITESPACE.replace_all(&without_times, " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        return None;
    }

    Some(canonicalize_labels(trimmed))
}

fn canonicalize_labels(line: &str) -> String {
    let line = CUIT_GARBLED.replace_all(line, "CUIT");
    let line = CUIL_GARBLED.replace_all(&line, "CUIL");
    RUC_DOTTED.replace_all(&line, "RUC").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLES: &[&str] = &[
        "9:41\nComprobante de transferencia\n\n  De\n Sandra   Gabriela Diaz\nC.U.I.T.: 27-12345678-4",
        "Lunes, 05 de enero de 2026 a las 10:32hs\n$ 124.740",
        "CU1T 20-11111111-1\tR.U.C. 4567890-1\nCUlL: 23-22222222-9",
        "  \n\n",
        "CU 10:30 IT",
        "Gs. 150.000 10:05 pm",
    ];

    #[test]
    fn test_strips_time_lines() {
        assert_eq!(normalize("9:41\nTransferencia enviada\n10:32 hs"), "Transferencia enviada");
    }

    #[test]
    fn test_removes_inline_times() {
        assert_eq!(
            normalize("Lunes, 05 de enero de 2026 a las 10:32hs"),
            "Lunes, 05 de enero de 2026 a las"
        );
    }

    #[test]
    fn test_collapses_whitespace_keeps_lines() {
        assert_eq!(normalize("  Sandra \t Gabriela   Diaz \n\n Para "), "Sandra Gabriela Diaz\nPara");
    }

    #[test]
    fn test_rewrites_tax_id_labels() {
        assert_eq!(
            normalize("C.U.I.T.: 27-12345678-4\nCU1T 20-1\nCUlL: 23-2\nR.U.C. 4567890-1"),
            "CUIT: 27-12345678-4\nCUIT 20-1\nCUIL: 23-2\nRUC 4567890-1"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n \t\n"), "");
    }

    #[test]
    fn test_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample: {sample:?}");
        }
    }
}
