//! OCR engine seam and recognized-text types.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Converts one RGB raster into text segments.
///
/// Implementations are called behind a lock by the pipeline, so they only
/// need to be `Send`.
pub trait TextRecognizer: Send {
    /// Recognize text in `image` for the requested languages.
    fn recognize(&self, image: RgbImage, languages: &[String]) -> Result<RawRecognizedText, OcrError>;
}

/// A recognized text segment with its quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSegment {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextSegment {
    /// A segment with no geometry, e.g. from a plain-text source.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            bbox: [0.0; 8],
            text: text.into(),
            confidence: 1.0,
        }
    }

    pub fn with_bbox(mut self, bbox: [f32; 8]) -> Self {
        self.bbox = bbox;
        self
    }

    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    fn row(&self) -> i32 {
        let (_, y, _, _) = self.rect();
        // Group by approximate vertical position (within 20 pixels)
        (y / 20.0) as i32
    }
}

/// Ordered text segments produced for one image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecognizedText {
    /// Segments in reading order.
    pub segments: Vec<TextSegment>,

    /// Recognition time in milliseconds.
    pub processing_time_ms: u64,
}

impl RawRecognizedText {
    /// Build from already-ordered lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: lines.into_iter().map(TextSegment::new).collect(),
            processing_time_ms: 0,
        }
    }

    /// Sort segments top-to-bottom, then left-to-right within a row.
    pub fn sort_by_reading_order(&mut self) {
        self.segments.sort_by(|a, b| {
            let (row_a, row_b) = (a.row(), b.row());
            if row_a != row_b {
                row_a.cmp(&row_b)
            } else {
                let (ax, _, _, _) = a.rect();
                let (bx, _, _, _) = b.rect();
                ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
    }

    /// Merge consecutive segments sharing a row into one space-joined segment.
    ///
    /// Expects reading order.
    pub fn merge_rows(&mut self) {
        let mut merged: Vec<TextSegment> = Vec::with_capacity(self.segments.len());

        for segment in self.segments.drain(..) {
            match merged.last_mut() {
                Some(last) if last.row() == segment.row() => {
                    last.text.push(' ');
                    last.text.push_str(&segment.text);
                    last.confidence = last.confidence.min(segment.confidence);
                    let (_, _, max_x, _) = segment.rect();
                    last.bbox[2] = last.bbox[2].max(max_x);
                    last.bbox[4] = last.bbox[4].max(max_x);
                }
                _ => merged.push(segment),
            }
        }

        self.segments = merged;
    }

    /// Full text, one segment per line.
    pub fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }
}
