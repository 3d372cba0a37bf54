//! Gemini `generateContent` client.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{AssistError, ReciboError};
use crate::models::config::AssistConfig;
use crate::models::StructuredGuess;

use super::{build_prompt, parse_guess, AssistService};

/// Blocking client for the Gemini REST API.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: &AssistConfig) -> Result<Self, ReciboError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ReciboError::Config("generative service API key is not set".to_string()))?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReciboError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn request_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(text) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0
            }
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AssistError {
        if e.is_timeout() {
            AssistError::Timeout(self.timeout)
        } else {
            AssistError::Transport(e.to_string())
        }
    }
}

impl AssistService for GeminiClient {
    fn structured_guess(&self, text: &str) -> Result<StructuredGuess, AssistError> {
        let start = Instant::now();
        debug!("Requesting structured guess from {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(text))
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response.json().map_err(|e| {
            if e.is_timeout() {
                AssistError::Timeout(self.timeout)
            } else {
                AssistError::schema(format!("response body is not JSON: {}", e))
            }
        })?;

        let answer = candidate_text(&body)
            .ok_or_else(|| AssistError::schema("response has no candidate text"))?;
        let guess = parse_guess(answer)?;

        info!(
            "Structured guess received in {}ms",
            start.elapsed().as_millis()
        );

        Ok(guess)
    }
}

/// Text of the first part of the first candidate.
fn candidate_text(body: &serde_json::Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}
