//! Core library for Brazilian sales-order OCR processing.
//!
//! This crate provides:
//! - Field extraction from OCR text of paper order forms (customer, dates,
//!   CPF/CNPJ, address, payment terms)
//! - Item table reconstruction from delimiter-free lines
//! - Confidence and provenance tagging of extracted values
//! - Idempotent persistence (field upsert, item table replace)
//! - Interchangeable OCR providers (local PaddleOCR models, Google Cloud Vision)

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod store;

pub use error::{OcrError, PedidoError, Result, StoreError};
pub use extraction::{MatchKind, OrderParser};
pub use models::config::{OcrProviderKind, PedidoConfig};
pub use models::record::{
    CaseId, Diagnostics, ExtractionResult, FieldRecord, FieldValue, LineItem, Source,
};
pub use ocr::{create_provider, OcrProvider};
pub use pipeline::{ExtractionEngine, ExtractionReport};
pub use store::{MemoryStore, PersistenceWriter, RecordStore, UpsertOutcome, WriteSummary};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
