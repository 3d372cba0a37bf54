//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, RgbImage};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{RawRecognizedText, TextRecognizer, TextSegment};

/// Languages covered by the Latin recognition model and dictionary.
const LATIN_LANGUAGES: &[&str] = &["es", "en", "pt", "fr", "it", "de", "ca", "gl", "eu", "la"];

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig, config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "{} not found (run `recibo models download`)",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine, config })
    }

    fn check_languages(languages: &[String]) -> Result<(), OcrError> {
        match languages
            .iter()
            .find(|lang| !LATIN_LANGUAGES.contains(&lang.trim().to_ascii_lowercase().as_str()))
        {
            Some(lang) => Err(OcrError::UnsupportedLanguage(lang.clone())),
            None => Ok(()),
        }
    }
}

impl TextRecognizer for PureOcrEngine {
    fn recognize(&self, image: RgbImage, languages: &[String]) -> Result<RawRecognizedText, OcrError> {
        Self::check_languages(languages)?;

        let start = Instant::now();
        let (width, height) = image.dimensions();
        info!("Recognizing image: {}x{}", width, height);

        let results = self
            .engine
            .run_from_image(&DynamicImage::ImageRgb8(image))
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let segments = results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextSegment {
                    bbox: polygon_to_bbox(&r.bounding_box),
                    text,
                    confidence: r.confidence,
                }
            })
            .collect();

        let mut raw = RawRecognizedText {
            segments,
            processing_time_ms: 0,
        };
        raw.sort_by_reading_order();
        if self.config.paragraph {
            raw.merge_rows();
        }
        raw.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "OCR complete: {} segments in {}ms",
            raw.segments.len(),
            raw.processing_time_ms
        );

        Ok(raw)
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
///
/// Extracts the first 4 exterior points (quadrilateral) as
/// `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_check() {
        assert!(PureOcrEngine::check_languages(&["es".to_string(), "PT".to_string()]).is_ok());
        assert!(matches!(
            PureOcrEngine::check_languages(&["gn".to_string()]),
            Err(OcrError::UnsupportedLanguage(lang)) if lang == "gn"
        ));
    }

    #[test]
    fn test_missing_models() {
        let dir = std::env::temp_dir().join("recibo-no-models-here");
        let result = PureOcrEngine::from_dir(&dir, &ModelConfig::default(), OcrConfig::default());
        assert!(matches!(result, Err(OcrError::ModelLoad(_))));
    }
}
