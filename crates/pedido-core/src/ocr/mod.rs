//! OCR providers turning a scanned order form into plaintext.
//!
//! Every provider has the same contract: image bytes in, plaintext out, lines
//! in top-to-bottom visual order. Line order matters downstream, since item
//! descriptions continue across physical lines.

#[cfg(feature = "cloud")]
mod cloud;
#[cfg(feature = "native")]
mod local;

#[cfg(feature = "cloud")]
pub use cloud::CloudOcrProvider;
#[cfg(feature = "native")]
pub use local::LocalOcrProvider;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrProviderKind};

/// Image-to-text collaborator.
pub trait OcrProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Recognize the text of one encoded image (PNG, JPEG, ...).
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Build the provider selected by `config.provider`.
pub fn create_provider(config: &OcrConfig) -> Result<Box<dyn OcrProvider>, OcrError> {
    match config.provider {
        #[cfg(feature = "native")]
        OcrProviderKind::Local => Ok(Box::new(LocalOcrProvider::from_config(&config.local)?)),
        #[cfg(feature = "cloud")]
        OcrProviderKind::Cloud => Ok(Box::new(CloudOcrProvider::from_config(&config.cloud)?)),
        #[allow(unreachable_patterns)]
        other => Err(OcrError::Unavailable(other.to_string())),
    }
}

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub score: f32,
}

impl TextBox {
    /// Get the center point of the bounding box.
    pub fn center(&self) -> (f32, f32) {
        let x = (self.bbox[0] + self.bbox[2] + self.bbox[4] + self.bbox[6]) / 4.0;
        let y = (self.bbox[1] + self.bbox[3] + self.bbox[5] + self.bbox[7]) / 4.0;
        (x, y)
    }

    /// Leftmost x coordinate.
    pub fn left(&self) -> f32 {
        [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]]
            .into_iter()
            .fold(f32::INFINITY, f32::min)
    }
}

/// Mean recognition score over the boxes; `None` for an empty page.
pub fn mean_score(boxes: &[TextBox]) -> Option<f32> {
    if boxes.is_empty() {
        return None;
    }
    Some(boxes.iter().map(|b| b.score).sum::<f32>() / boxes.len() as f32)
}

/// Join text boxes into lines of text in reading order.
///
/// Boxes are sorted by vertical centre; a box whose centre lies within
/// `row_tolerance` pixels of the current row's first box joins that row.
/// Each row is ordered left to right and joined with single spaces.
pub fn boxes_to_text(mut boxes: Vec<TextBox>, row_tolerance: f32) -> String {
    boxes.retain(|b| !b.text.trim().is_empty());
    boxes.sort_by(|a, b| a.center().1.total_cmp(&b.center().1));

    let mut rows: Vec<Vec<TextBox>> = Vec::new();
    let mut row_y = f32::NEG_INFINITY;
    for b in boxes {
        let y = b.center().1;
        match rows.last_mut() {
            Some(row) if (y - row_y).abs() <= row_tolerance => row.push(b),
            _ => {
                row_y = y;
                rows.push(vec![b]);
            }
        }
    }

    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.left().total_cmp(&b.left()));
            row.iter()
                .map(|b| b.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_box(text: &str, x: f32, y: f32) -> TextBox {
        let (w, h) = (40.0, 10.0);
        TextBox {
            bbox: [x, y, x + w, y, x + w, y + h, x, y + h],
            text: text.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_mean_score() {
        let mut low = text_box("A1", 0.0, 0.0);
        low.score = 0.5;
        let mut high = text_box("B2", 0.0, 20.0);
        high.score = 1.0;
        assert_eq!(mean_score(&[low, high]), Some(0.75));
        assert_eq!(mean_score(&[]), None);
    }

    #[test]
    fn test_boxes_grouped_into_rows() {
        let boxes = vec![
            text_box("1.200,00", 300.0, 52.0),
            text_box("Cód.", 10.0, 10.0),
            text_box("A1", 10.0, 50.0),
            text_box("Descrição", 60.0, 12.0),
            text_box("Produto X", 60.0, 48.0),
        ];
        assert_eq!(
            boxes_to_text(boxes, 15.0),
            "Cód. Descrição\nA1 Produto X 1.200,00"
        );
    }

    #[test]
    fn test_blank_boxes_are_dropped() {
        let boxes = vec![text_box("  ", 0.0, 0.0), text_box("Nome: Ana", 0.0, 30.0)];
        assert_eq!(boxes_to_text(boxes, 15.0), "Nome: Ana");
        assert_eq!(boxes_to_text(Vec::new(), 15.0), "");
    }

    #[test]
    fn test_zero_tolerance_keeps_rows_apart() {
        let boxes = vec![text_box("a", 0.0, 0.0), text_box("b", 50.0, 3.0)];
        assert_eq!(boxes_to_text(boxes, 0.0), "a\nb");
    }
}
