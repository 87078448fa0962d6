//! End-to-end extraction passes.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OcrError, Result};
use crate::extraction::OrderParser;
use crate::models::config::{PedidoConfig, StoreConfig};
use crate::models::record::{CaseId, ExtractionResult};
use crate::ocr::{create_provider, OcrProvider};
use crate::store::{PersistenceWriter, RecordStore, WriteSummary};

/// Outcome of a persisted extraction pass, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub result: ExtractionResult,
    pub writes: WriteSummary,
}

/// Extraction entry point configured from a [`PedidoConfig`].
///
/// Passes are independent; one engine can run many of them concurrently.
pub struct ExtractionEngine {
    parser: OrderParser,
    store: StoreConfig,
    provider: Option<Box<dyn OcrProvider>>,
}

impl ExtractionEngine {
    /// Engine for text input only; image input needs a provider.
    pub fn new(config: &PedidoConfig) -> Self {
        Self {
            parser: OrderParser::from_config(&config.extraction, &config.store),
            store: config.store.clone(),
            provider: None,
        }
    }

    /// Engine with the OCR provider selected in the configuration.
    pub fn from_config(config: &PedidoConfig) -> Result<Self> {
        let provider = create_provider(&config.ocr)?;
        Ok(Self::new(config).with_provider(provider))
    }

    pub fn with_provider(mut self, provider: Box<dyn OcrProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the parser settings.
    pub fn with_parser(mut self, parser: OrderParser) -> Self {
        self.parser = parser;
        self
    }

    /// Extract without persisting.
    pub fn extract(&self, case_id: &CaseId, text: &str) -> ExtractionResult {
        self.parser.parse(case_id, text)
    }

    /// Extract from text and persist the result.
    pub fn run(&self, case_id: &CaseId, text: &str, store: &dyn RecordStore) -> ExtractionReport {
        let result = self.extract(case_id, text);
        let writes = PersistenceWriter::from_config(store, &self.store).write(&result);
        if writes.has_failures() {
            warn!(
                "Case {} persisted partially: {} field and {} row writes failed",
                case_id, writes.fields_failed, writes.rows_failed
            );
        }
        ExtractionReport { result, writes }
    }

    /// Recognize an image with the configured provider.
    ///
    /// Fails with [`OcrError::EmptyText`] when the provider returns only
    /// whitespace.
    pub fn recognize(&self, image: &[u8]) -> Result<String> {
        let provider = self
            .provider
            .as_deref()
            .ok_or_else(|| OcrError::Unavailable("none configured".to_string()))?;
        info!("Running OCR with provider {}", provider.name());
        let text = provider.recognize(image)?;
        if text.trim().is_empty() {
            return Err(OcrError::EmptyText.into());
        }
        Ok(text)
    }

    /// OCR an image, then extract and persist.
    ///
    /// An OCR failure aborts the pass before anything is extracted or
    /// written.
    pub fn process_document(
        &self,
        case_id: &CaseId,
        image: &[u8],
        store: &dyn RecordStore,
    ) -> Result<ExtractionReport> {
        let text = self.recognize(image)?;
        Ok(self.run(case_id, &text, store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PedidoError;
    use crate::models::record::{FieldValue, Source};
    use crate::store::MemoryStore;

    struct FixedProvider(&'static str);

    impl OcrProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recognize(&self, _image: &[u8]) -> std::result::Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct DownProvider;

    impl OcrProvider for DownProvider {
        fn name(&self) -> &'static str {
            "down"
        }

        fn recognize(&self, _image: &[u8]) -> std::result::Result<String, OcrError> {
            Err(OcrError::Unreachable {
                provider: "down".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn test_process_document_persists() {
        let engine = ExtractionEngine::new(&PedidoConfig::default())
            .with_provider(Box::new(FixedProvider("Nome: Maria Silva\nCPF: 123.456.789-01")));
        let store = MemoryStore::new();
        let case = CaseId::new("p-1");

        let report = engine.process_document(&case, b"png", &store).unwrap();
        assert_eq!(report.writes.fields_written, report.result.fields.len());

        let cpf = store.get_field(&case, "cpf").unwrap().unwrap();
        assert_eq!(cpf.value, FieldValue::text("12345678901"));
        assert_eq!(cpf.source, Source::Ocr);
    }

    #[test]
    fn test_empty_ocr_text_aborts() {
        let engine = ExtractionEngine::new(&PedidoConfig::default())
            .with_provider(Box::new(FixedProvider("  \n ")));
        let store = MemoryStore::new();
        let case = CaseId::new("p-2");

        let err = engine.process_document(&case, b"png", &store).unwrap_err();
        assert!(matches!(err, PedidoError::Ocr(OcrError::EmptyText)));
        assert!(store.list_fields(&case).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_provider_aborts() {
        let engine =
            ExtractionEngine::new(&PedidoConfig::default()).with_provider(Box::new(DownProvider));
        let store = MemoryStore::new();
        let err = engine
            .process_document(&CaseId::new("p-3"), b"png", &store)
            .unwrap_err();
        assert!(matches!(err, PedidoError::Ocr(OcrError::Unreachable { .. })));
    }

    #[test]
    fn test_no_provider_configured() {
        let engine = ExtractionEngine::new(&PedidoConfig::default());
        assert!(engine.recognize(b"png").is_err());
    }

    #[test]
    fn test_writer_id_from_config() {
        let mut config = PedidoConfig::default();
        config.store.writer_id = "scanner-2".to_string();
        let engine = ExtractionEngine::new(&config);
        let result = engine.extract(&CaseId::new("c"), "Vendedor: Carlos");
        assert_eq!(result.fields[0].last_updated_by, "scanner-2");
    }
}
