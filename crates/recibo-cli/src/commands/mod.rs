//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod models;
pub mod output;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use recibo_core::models::config::ReciboConfig;
use recibo_core::{ExtractionPipeline, Extraction, PipelineBuilder, PureOcrEngine};

/// Image extensions handed to the OCR engine.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tiff", "tif"];

/// Kind of input file, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Raster image, recognized with OCR.
    Image,
    /// Already-recognized text.
    Text,
}

impl InputKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else if extension == "txt" {
            Some(Self::Text)
        } else {
            None
        }
    }
}

/// Load configuration: explicit path, else the user config file, else defaults.
///
/// Environment overrides are applied last.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReciboConfig> {
    let mut config = match config_path {
        Some(path) => ReciboConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                ReciboConfig::from_file(&default_path)?
            } else {
                ReciboConfig::default()
            }
        }
    };

    config.apply_env();
    Ok(config)
}

/// Model directory: explicit flag, else the configured one if present, else
/// the download location.
pub fn resolve_model_dir(flag: Option<PathBuf>, config: &ReciboConfig) -> PathBuf {
    flag.unwrap_or_else(|| {
        if config.models.model_dir.exists() {
            config.models.model_dir.clone()
        } else {
            models::default_model_dir()
        }
    })
}

/// Build a pipeline. The OCR engine is loaded only when images are processed.
pub fn build_pipeline(config: &ReciboConfig, with_ocr: bool) -> anyhow::Result<ExtractionPipeline> {
    let mut builder = PipelineBuilder::from_config(config)?;

    if with_ocr {
        let engine = PureOcrEngine::from_dir(&config.models.model_dir, &config.models, config.ocr.clone())
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to load OCR models: {}\n\nRun 'recibo models download' to fetch them.",
                    e
                )
            })?;
        builder = builder.with_recognizer(engine);
    }

    Ok(builder.with_configured_assist(&config.assist)?.build())
}

/// Run one file through the pipeline.
pub fn extract_file(pipeline: &ExtractionPipeline, path: &Path) -> anyhow::Result<Extraction> {
    match InputKind::of(path) {
        Some(InputKind::Image) => {
            let bytes = std::fs::read(path)?;
            Ok(pipeline.extract(&bytes)?)
        }
        Some(InputKind::Text) => {
            let text = std::fs::read_to_string(path)?;
            Ok(pipeline.extract_text(&text))
        }
        None => anyhow::bail!("Unsupported file format: {}", path.display()),
    }
}
