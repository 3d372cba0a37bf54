//! Generative-service assistance: prompt, response validation and clients.

#[cfg(feature = "native")]
mod gemini;

#[cfg(feature = "native")]
pub use gemini::GeminiClient;

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AssistError;
use crate::models::{Currency, StructuredGuess};

/// A service that proposes a structured record for recognized text.
///
/// One call per extraction, no retries. Every failure is reported as an
/// [`AssistError`]; the pipeline decides what to do with it.
pub trait AssistService: Send + Sync {
    fn structured_guess(&self, text: &str) -> Result<StructuredGuess, AssistError>;
}

/// Build the instruction sent along with the recognized text.
pub fn build_prompt(text: &str) -> String {
    format!(
        r#"Sos un extractor de datos de comprobantes de pago (Argentina y Paraguay).
A partir del texto OCR, devolvé SOLO JSON válido (sin markdown) con estas claves:

{{
  "emitter": string|null,
  "recipient": string|null,
  "amount": number|null,
  "currency": "ARS"|"PYG"|null,
  "date": "YYYY-MM-DD"|null,
  "operation_id": string|null
}}

Reglas:
- Si hay varios montos, elegir el TOTAL o MONTO FINAL.
- currency: ARS o PYG según símbolos y pistas (₲, PYG, Guaraníes; $, ARS, Pesos).
- date normalizada a YYYY-MM-DD.
- operation_id: solo dígitos del número de operación, transferencia o autorización.
- Si no estás seguro, usar null.

TEXTO OCR:
{text}"#
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGuess {
    emitter: Option<String>,
    recipient: Option<String>,
    amount: Option<serde_json::Number>,
    currency: Option<String>,
    date: Option<String>,
    operation_id: Option<String>,
}

/// Parse and validate the model's text answer.
///
/// Markdown fences and surrounding prose are tolerated: the first `{` to the
/// last `}` is taken as the object. Missing keys are null, unknown keys are
/// ignored, and any value outside its declared shape rejects the whole guess.
pub fn parse_guess(answer: &str) -> Result<StructuredGuess, AssistError> {
    let object = locate_object(answer)
        .ok_or_else(|| AssistError::schema("no JSON object in response"))?;

    let raw: RawGuess = serde_json::from_str(object)
        .map_err(|e| AssistError::schema(format!("invalid JSON object: {}", e)))?;

    validate(raw)
}

fn locate_object(answer: &str) -> Option<&str> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (end > start).then(|| &answer[start..=end])
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(raw: RawGuess) -> Result<StructuredGuess, AssistError> {
    let amount = match raw.amount {
        Some(number) => {
            let repr = number.to_string();
            let value = Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .map_err(|_| AssistError::schema(format!("amount out of range: {}", repr)))?;
            if value.is_sign_negative() && !value.is_zero() {
                return Err(AssistError::schema(format!("negative amount: {}", repr)));
            }
            Some(value)
        }
        None => None,
    };

    let currency = match non_blank(raw.currency) {
        Some(code) => Some(
            Currency::from_code(&code)
                .ok_or_else(|| AssistError::schema(format!("unknown currency: {}", code)))?,
        ),
        None => None,
    };

    let date = match non_blank(raw.date) {
        Some(date) => Some(
            NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|_| AssistError::schema(format!("date is not YYYY-MM-DD: {}", date)))?,
        ),
        None => None,
    };

    let operation_id = match non_blank(raw.operation_id) {
        Some(id) if id.chars().all(|c| c.is_ascii_digit()) => Some(id),
        Some(id) => {
            return Err(AssistError::schema(format!(
                "operation_id is not all digits: {}",
                id
            )))
        }
        None => None,
    };

    Ok(StructuredGuess {
        emitter: non_blank(raw.emitter),
        recipient: non_blank(raw.recipient),
        amount,
        currency,
        date,
        operation_id,
    })
}
