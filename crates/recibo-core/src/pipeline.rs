//! Extraction pipeline: fingerprint, cached OCR, rules, then assisted merge.

use std::fmt;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::assist::AssistService;
use crate::cache::{Fingerprint, OcrCache};
use crate::error::{AssistError, OcrError, Result};
#[cfg(feature = "native")]
use crate::models::config::AssistConfig;
use crate::models::config::ReciboConfig;
use crate::models::ExtractedRecord;
use crate::ocr::TextRecognizer;
use crate::receipt::{normalize, ReceiptParser, RuleBasedParser};

/// What happened to the generative-service step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    /// No service configured.
    Disabled,
    /// The guess was merged into the record.
    Applied,
    /// The call failed; the rule-based record was kept.
    Degraded(AssistError),
}

impl fmt::Display for AssistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Applied => f.write_str("applied"),
            Self::Degraded(e) => write!(f, "degraded ({})", e),
        }
    }
}

/// Result of one extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Final record.
    pub record: ExtractedRecord,
    /// Fingerprint of the input bytes.
    pub fingerprint: Fingerprint,
    /// Text came from the cache instead of a fresh OCR run.
    pub from_cache: bool,
    /// Outcome of the generative-service step.
    pub assist: AssistOutcome,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Builder for [`ExtractionPipeline`].
pub struct PipelineBuilder {
    recognizer: Option<Box<dyn TextRecognizer>>,
    parser: Box<dyn ReceiptParser>,
    assist: Option<Box<dyn AssistService>>,
    cache_capacity: usize,
    languages: Vec<String>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            recognizer: None,
            parser: Box::new(RuleBasedParser::new()),
            assist: None,
            cache_capacity: 64,
            languages: vec!["es".to_string()],
        }
    }

    /// Builder seeded from configuration, without OCR engine or assistance.
    pub fn from_config(config: &ReciboConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self::new()
            .with_cache_capacity(config.cache.capacity)
            .with_languages(config.ocr.languages.clone())
            .with_parser(
                RuleBasedParser::new().with_platform_brands(config.extraction.platform_brands.clone()),
            ))
    }

    pub fn with_recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn with_parser(mut self, parser: impl ReceiptParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn with_assist(mut self, assist: impl AssistService + 'static) -> Self {
        self.assist = Some(Box::new(assist));
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Attach the Gemini client when the configuration allows a call.
    #[cfg(feature = "native")]
    pub fn with_configured_assist(self, config: &AssistConfig) -> Result<Self> {
        if config.is_usable() {
            return Ok(self.with_assist(crate::assist::GeminiClient::from_config(config)?));
        }

        if config.enabled {
            warn!("No generative-service API key; using rule-based extraction only");
        }
        Ok(self)
    }

    pub fn build(self) -> ExtractionPipeline {
        ExtractionPipeline {
            recognizer: self.recognizer.map(Mutex::new),
            cache: OcrCache::new(self.cache_capacity),
            parser: self.parser,
            assist: self.assist,
            languages: self.languages,
        }
    }
}

/// Turns receipt images into [`ExtractedRecord`]s.
///
/// Safe to share across threads: the cache and the OCR engine are each
/// behind their own lock, so concurrent extractions run OCR one at a time
/// and everything else in parallel.
pub struct ExtractionPipeline {
    recognizer: Option<Mutex<Box<dyn TextRecognizer>>>,
    cache: OcrCache,
    parser: Box<dyn ReceiptParser>,
    assist: Option<Box<dyn AssistService>>,
    languages: Vec<String>,
}

impl ExtractionPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Pipeline with the ONNX engine and, when a key is available, Gemini.
    #[cfg(feature = "native")]
    pub fn from_config(config: &ReciboConfig) -> Result<Self> {
        let engine = crate::ocr::PureOcrEngine::from_dir(
            &config.models.model_dir,
            &config.models,
            config.ocr.clone(),
        )?;

        Ok(PipelineBuilder::from_config(config)?
            .with_recognizer(engine)
            .with_configured_assist(&config.assist)?
            .build())
    }

    /// Extract a record from raw image bytes.
    ///
    /// Fails only when text cannot be recognized.
    pub fn extract(&self, image_bytes: &[u8]) -> Result<Extraction> {
        let start = Instant::now();
        let fingerprint = Fingerprint::of(image_bytes);

        let mut recognized = false;
        let text = self.cache.get_or_compute(&fingerprint, || {
            recognized = true;
            self.recognize(image_bytes)
        })?;

        Ok(self.finish(text, fingerprint, !recognized, start))
    }

    /// Extract a record from raw image bytes, discarding the report.
    pub fn extract_all(&self, image_bytes: &[u8]) -> Result<ExtractedRecord> {
        Ok(self.extract(image_bytes)?.record)
    }

    /// Extract a record from already-recognized text.
    pub fn extract_text(&self, raw_text: &str) -> Extraction {
        let start = Instant::now();
        let fingerprint = Fingerprint::of(raw_text.as_bytes());
        self.finish(normalize(raw_text), fingerprint, false, start)
    }

    pub fn cache(&self) -> &OcrCache {
        &self.cache
    }

    pub fn has_assist(&self) -> bool {
        self.assist.is_some()
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<String> {
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or_else(|| OcrError::ModelLoad("no OCR engine configured".to_string()))?;

        let image = image::load_from_memory(image_bytes)
            .map_err(|e| OcrError::Decode(e.to_string()))?
            .to_rgb8();

        let raw = recognizer.lock().recognize(image, &self.languages)?;
        debug!(
            "Recognized {} segments in {}ms",
            raw.segments.len(),
            raw.processing_time_ms
        );

        Ok(normalize(&raw.to_text()))
    }

    fn finish(&self, text: String, fingerprint: Fingerprint, from_cache: bool, start: Instant) -> Extraction {
        let baseline = self.parser.parse(&text);

        let (record, assist) = match &self.assist {
            None => (baseline, AssistOutcome::Disabled),
            Some(service) => match service.structured_guess(&text) {
                Ok(guess) => (baseline.merged_with(&guess), AssistOutcome::Applied),
                Err(e) => {
                    warn!("Assisted extraction degraded for {}: {}", fingerprint, e);
                    (baseline, AssistOutcome::Degraded(e))
                }
            },
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} ({}, cached: {}) in {}ms",
            fingerprint, record.provenance, from_cache, processing_time_ms
        );

        Extraction {
            record,
            fingerprint,
            from_cache,
            assist,
            processing_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Provenance, StructuredGuess};
    use crate::ocr::RawRecognizedText;
    use crate::ReciboError;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const LINES: &[&str] = &[
        "9:41",
        "Comprobante de transferencia",
        "Lunes, 05 de enero de 2026 a las 10:32hs",
        "$  124.740",
        "De",
        "Sandra Gabriela Diaz",
        "C.U.I.T.: 27-12345678-4",
        "Para",
        "Romina Lopez",
        "Número de operación de Mercado Pago 140076552211",
    ];

    struct FakeRecognizer {
        calls: Arc<AtomicUsize>,
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, _image: RgbImage, _languages: &[String]) -> std::result::Result<RawRecognizedText, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawRecognizedText::from_lines(LINES.iter().copied()))
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image: RgbImage, _languages: &[String]) -> std::result::Result<RawRecognizedText, OcrError> {
            Err(OcrError::Recognition("engine crashed".to_string()))
        }
    }

    struct FakeAssist(std::result::Result<StructuredGuess, AssistError>);

    impl AssistService for FakeAssist {
        fn structured_guess(&self, _text: &str) -> std::result::Result<StructuredGuess, AssistError> {
            self.0.clone()
        }
    }

    fn png(shade: u8) -> Vec<u8> {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn counting_pipeline() -> (ExtractionPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ExtractionPipeline::builder()
            .with_recognizer(FakeRecognizer { calls: Arc::clone(&calls) })
            .with_cache_capacity(2)
            .build();
        (pipeline, calls)
    }

    #[test]
    fn test_rule_based_extraction() {
        let (pipeline, _) = counting_pipeline();
        let extraction = pipeline.extract(&png(255)).unwrap();
        let record = extraction.record;

        assert_eq!(record.emitter.as_deref(), Some("Sandra Gabriela Diaz"));
        assert_eq!(record.recipient.as_deref(), Some("Romina Lopez"));
        assert_eq!(record.amount, Some(Decimal::from(124740)));
        assert_eq!(record.currency, Some(Currency::Ars));
        assert_eq!(record.date.map(|d| d.to_string()).as_deref(), Some("2026-01-05"));
        assert_eq!(record.operation_id.as_deref(), Some("140076552211"));
        assert_eq!(record.provenance, Provenance::RuleBased);
        assert!(record.raw_text.contains("CUIT: 27-12345678-4"));
        assert!(!record.raw_text.contains("9:41"));
        assert_eq!(extraction.assist, AssistOutcome::Disabled);
    }

    #[test]
    fn test_repeated_bytes_hit_cache() {
        let (pipeline, calls) = counting_pipeline();
        let bytes = png(200);

        let first = pipeline.extract(&bytes).unwrap();
        let second = pipeline.extract(&bytes).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.record, second.record);

        pipeline.extract(&png(10)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_guess_fields_override_baseline() {
        let guess = StructuredGuess {
            amount: None,
            currency: Some(Currency::Pyg),
            ..StructuredGuess::default()
        };
        let pipeline = ExtractionPipeline::builder()
            .with_recognizer(FakeRecognizer { calls: Arc::default() })
            .with_assist(FakeAssist(Ok(guess)))
            .build();

        let extraction = pipeline.extract(&png(1)).unwrap();
        assert_eq!(extraction.assist, AssistOutcome::Applied);
        assert_eq!(extraction.record.amount, Some(Decimal::from(124740)));
        assert_eq!(extraction.record.currency, Some(Currency::Pyg));
        assert_eq!(extraction.record.provenance, Provenance::LlmAssisted);
    }

    #[test]
    fn test_timeout_degrades_to_baseline() {
        let baseline = ExtractionPipeline::builder()
            .with_recognizer(FakeRecognizer { calls: Arc::default() })
            .build()
            .extract_all(&png(3))
            .unwrap();

        let timeout = AssistError::Timeout(Duration::from_secs(20));
        let pipeline = ExtractionPipeline::builder()
            .with_recognizer(FakeRecognizer { calls: Arc::default() })
            .with_assist(FakeAssist(Err(timeout.clone())))
            .build();

        let extraction = pipeline.extract(&png(3)).unwrap();
        assert_eq!(extraction.record, baseline);
        assert_eq!(extraction.record.provenance, Provenance::RuleBased);
        assert_eq!(extraction.assist, AssistOutcome::Degraded(timeout));
    }

    #[test]
    fn test_recognition_failure_is_fatal() {
        let pipeline = ExtractionPipeline::builder()
            .with_recognizer(FailingRecognizer)
            .with_assist(FakeAssist(Ok(StructuredGuess::default())))
            .build();

        let err = pipeline.extract(&png(0)).unwrap_err();
        assert!(matches!(err, ReciboError::Recognition(OcrError::Recognition(_))));
        assert!(pipeline.cache().is_empty());
    }

    #[test]
    fn test_undecodable_bytes() {
        let (pipeline, calls) = counting_pipeline();
        let err = pipeline.extract(b"not an image").unwrap_err();
        assert!(matches!(err, ReciboError::Recognition(OcrError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_engine() {
        let pipeline = ExtractionPipeline::builder().build();
        assert!(matches!(
            pipeline.extract(&png(0)),
            Err(ReciboError::Recognition(OcrError::ModelLoad(_)))
        ));
    }

    #[test]
    fn test_extract_text_skips_ocr() {
        let pipeline = ExtractionPipeline::builder().build();
        let extraction = pipeline.extract_text("Gs.   150.000\n10:05");
        assert_eq!(extraction.record.raw_text, "Gs. 150.000");
        assert_eq!(extraction.record.currency, Some(Currency::Pyg));
        assert!(!extraction.from_cache);
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<ExtractionPipeline>();
    }

    #[test]
    fn test_from_config_builder() {
        let mut config = ReciboConfig::default();
        config.cache.capacity = 5;
        let pipeline = PipelineBuilder::from_config(&config).unwrap().build();
        assert_eq!(pipeline.cache().capacity(), 5);
        assert!(!pipeline.has_assist());

        config.cache.capacity = 0;
        assert!(PipelineBuilder::from_config(&config).is_err());
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_configured_assist_needs_key() {
        let mut config = ReciboConfig::default();
        let pipeline = ExtractionPipeline::builder()
            .with_configured_assist(&config.assist)
            .unwrap()
            .build();
        assert!(!pipeline.has_assist());

        config.assist.api_key = Some("key".to_string());
        let pipeline = ExtractionPipeline::builder()
            .with_configured_assist(&config.assist)
            .unwrap()
            .build();
        assert!(pipeline.has_assist());

        config.assist.enabled = false;
        let pipeline = ExtractionPipeline::builder()
            .with_configured_assist(&config.assist)
            .unwrap()
            .build();
        assert!(!pipeline.has_assist());
    }
}
