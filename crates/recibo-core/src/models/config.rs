//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::ReciboError;

/// Environment variable holding the generative-service API key.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the generative model name.
pub const ENV_MODEL: &str = "GEMINI_MODEL";
/// Feature flag: `0`, `false`, `off` or `no` disables the generative call.
pub const ENV_ASSIST: &str = "RECIBO_ASSIST";

/// Main configuration for the recibo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReciboConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Recognized-text cache configuration.
    pub cache: CacheConfig,

    /// Generative-service configuration.
    pub assist: AssistConfig,

    /// Rule-based extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Languages requested from the engine.
    pub languages: Vec<String>,

    /// Merge segments that share a text row into one line.
    pub paragraph: bool,

    /// Keep `[UNK]` markers emitted for glyphs outside the dictionary.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: vec!["es".to_string()],
            paragraph: true,
            keep_unk: false,
        }
    }
}

/// Recognized-text cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached images.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Generative text service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Call the service at all.
    pub enabled: bool,

    /// Base URL of the service.
    pub endpoint: String,

    /// Model name.
    pub model: String,

    /// API key. Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl AssistConfig {
    /// Whether a call can actually be made.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Rule-based extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Payment-platform names that are never a party.
    pub platform_brands: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            platform_brands: vec!["Mercado Pago".to_string()],
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ReciboConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.assist.api_key = Some(key);
        }

        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            debug!("Generative model overridden to {}", model);
            self.assist.model = model;
        }

        if let Some(flag) = lookup(ENV_ASSIST) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "off" | "no" => {
                    debug!("Assisted extraction disabled by {}", ENV_ASSIST);
                    self.assist.enabled = false;
                }
                "1" | "true" | "on" | "yes" => self.assist.enabled = true,
                other => warn!("Ignoring unrecognized {} value: {}", ENV_ASSIST, other),
            }
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ReciboError> {
        if self.cache.capacity == 0 {
            return Err(ReciboError::Config(
                "cache.capacity must be at least 1".to_string(),
            ));
        }

        if !(1..=60).contains(&self.assist.timeout_secs) {
            return Err(ReciboError::Config(format!(
                "assist.timeout_secs must be between 1 and 60, got {}",
                self.assist.timeout_secs
            )));
        }

        if self.ocr.languages.is_empty() {
            return Err(ReciboError::Config(
                "ocr.languages must name at least one language".to_string(),
            ));
        }

        Ok(())
    }
}
