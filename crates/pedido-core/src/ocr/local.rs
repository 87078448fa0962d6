//! On-device OCR using `pure-onnx-ocr` with PaddleOCR models.

use std::sync::Mutex;
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info};

use super::{boxes_to_text, mean_score, OcrProvider, TextBox};
use crate::error::OcrError;
use crate::models::config::LocalOcrConfig;

/// OCR provider running PaddleOCR detection and recognition models locally.
pub struct LocalOcrProvider {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    row_tolerance: f32,
}

impl LocalOcrProvider {
    /// Load the models named in `config`.
    pub fn from_config(config: &LocalOcrConfig) -> Result<Self, OcrError> {
        let det_path = config.model_path(&config.detection_model);
        let rec_path = config.model_path(&config.recognition_model);
        let dict_path = config.model_path(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
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

        info!("Loaded OCR models from {}", config.model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            row_tolerance: config.row_tolerance,
        })
    }
}

impl OcrProvider for LocalOcrProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let start = Instant::now();
        let image =
            image::load_from_memory(image).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let (width, height) = image.dimensions();
        debug!("Recognizing {}x{} image", width, height);

        let engine = self.engine.lock().map_err(|_| OcrError::Provider {
            provider: self.name().to_string(),
            message: "engine lock poisoned".to_string(),
        })?;
        let results = engine.run_from_image(&image).map_err(|e| OcrError::Provider {
            provider: self.name().to_string(),
            message: e.to_string(),
        })?;
        drop(engine);

        let boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: r.text.replace("[UNK]", " "),
                score: r.confidence,
            })
            .collect();

        info!(
            "OCR complete: {} text regions in {}ms, mean score {:.2}",
            boxes.len(),
            start.elapsed().as_millis(),
            mean_score(&boxes).unwrap_or(0.0)
        );

        Ok(boxes_to_text(boxes, self.row_tolerance))
    }
}

/// First four exterior points of a detection polygon as `[x1, y1, ..., x4, y4]`.
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
    use tempfile::TempDir;

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = TempDir::new().unwrap();
        let config = LocalOcrConfig {
            model_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let err = LocalOcrProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, OcrError::ModelLoad(_)));
    }
}
