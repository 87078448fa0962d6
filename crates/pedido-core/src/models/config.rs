//! Configuration structures for the extraction pipeline.
//!
//! The configuration is an explicit value handed to the entry points; nothing
//! in the core reads environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PedidoError, Result};
use crate::models::record::Source;

/// Main configuration for the pedido pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PedidoConfig {
    /// OCR provider configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Record store configuration.
    pub store: StoreConfig,
}

/// Which OCR provider turns images into plaintext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProviderKind {
    /// On-device PaddleOCR models.
    #[default]
    Local,
    /// Google Cloud Vision over HTTP.
    Cloud,
}

impl std::fmt::Display for OcrProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Cloud => f.write_str("cloud"),
        }
    }
}

/// OCR provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Active provider.
    pub provider: OcrProviderKind,

    /// Settings for the on-device provider.
    pub local: LocalOcrConfig,

    /// Settings for the HTTP provider.
    pub cloud: CloudOcrConfig,
}

/// On-device OCR model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Boxes whose vertical centres differ by less than this many pixels
    /// are joined into one line.
    pub row_tolerance: f32,
}

impl Default for LocalOcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            row_tolerance: 15.0,
        }
    }
}

impl LocalOcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// HTTP OCR provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudOcrConfig {
    /// Base URL of the Vision API.
    pub endpoint: String,

    /// API key sent as the `key` query parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Language hints passed to the recognizer.
    pub language_hints: Vec<String>,
}

impl Default for CloudOcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com".to_string(),
            api_key: None,
            timeout_secs: 60,
            language_hints: vec!["pt".to_string()],
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Verify CPF/CNPJ check digits; failing ids are dropped.
    pub validate_tax_id_checksum: bool,

    /// Number of normalized lines copied into the result preview.
    pub preview_lines: usize,

    /// Persist the raw OCR text as the `ocr_text` field.
    pub store_ocr_text: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            validate_tax_id_checksum: false,
            preview_lines: 10,
            store_ocr_text: true,
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Sources whose values are never overwritten by extraction.
    pub protected_sources: Vec<Source>,

    /// Recorded as `last_updated_by` on every engine write.
    pub writer_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("pedido.db"),
            protected_sources: vec![Source::Admin],
            writer_id: "ocr-engine".to_string(),
        }
    }
}

impl PedidoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PedidoError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PedidoConfig =
            serde_json::from_str(r#"{"ocr": {"provider": "cloud"}}"#).unwrap();
        assert_eq!(config.ocr.provider, OcrProviderKind::Cloud);
        assert_eq!(config.ocr.cloud.language_hints, vec!["pt".to_string()]);
        assert_eq!(config.store.protected_sources, vec![Source::Admin]);
        assert_eq!(config.extraction.preview_lines, 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PedidoConfig::default();
        config.store.writer_id = "scanner-7".to_string();
        config.save(&path).unwrap();

        let loaded = PedidoConfig::from_file(&path).unwrap();
        assert_eq!(loaded.store.writer_id, "scanner-7");
        assert_eq!(loaded.ocr.provider, OcrProviderKind::Local);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PedidoConfig::from_file(&path),
            Err(PedidoError::Config(_))
        ));
    }
}
