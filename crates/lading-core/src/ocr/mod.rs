//! OCR backends used when direct text extraction is insufficient.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Capability to turn a page image into text.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs and notes.
    fn name(&self) -> &'static str;

    /// Recognise the text on one page image.
    fn ocr_text(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Backend used when no OCR engine is available; every call fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledOcr {
    reason: String,
}

impl DisabledOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrBackend for DisabledOcr {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn ocr_text(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::NotConfigured(self.reason.clone()))
    }
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
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
}

/// Sort boxes top-to-bottom, then left-to-right within a row, and join
/// their text with newlines. Boxes within 20 px vertically share a row.
pub fn reading_order_text(boxes: &mut [TextBox]) -> String {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();

        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;

        row_a
            .cmp(&row_b)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });

    boxes
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let mut boxes = vec![
            text_box(200.0, 100.0, "Carrier"),
            text_box(10.0, 5.0, "SHIPPER:"),
            text_box(10.0, 102.0, "VESSEL:"),
        ];

        let text = reading_order_text(&mut boxes);
        assert_eq!(text, "SHIPPER:\nVESSEL:\nCarrier");
    }

    #[test]
    fn test_disabled_backend_fails() {
        let backend = DisabledOcr::new("models missing");
        let image = DynamicImage::new_rgb8(1, 1);
        assert!(matches!(
            backend.ocr_text(&image),
            Err(OcrError::NotConfigured(reason)) if reason == "models missing"
        ));
    }
}
