//! Structured record store and the persistence writer.
//!
//! Scalar fields are merged by `(case, key)`; the item table of a case is
//! replaced as a whole. The two operations are independent: a pass may leave
//! fields updated and items stale if it dies between them.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::config::StoreConfig;
use crate::models::record::{CaseId, ExtractionResult, FieldRecord, LineItem, Source};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of replacing a case's item table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub inserted: usize,
    pub failed: usize,
}

/// Result of a guarded field upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Written,
    /// The stored record came from this protected source and was kept.
    Protected(Source),
}

/// Whether a stored record from `existing` must survive a write from
/// `incoming`. A source may always overwrite its own records.
pub fn is_protected(existing: &Source, incoming: &Source, protected: &[Source]) -> bool {
    existing != incoming && protected.contains(existing)
}

/// Backend holding field records and line items.
///
/// Methods take `&self`; implementations own their locking so one store can
/// be shared by concurrent passes.
pub trait RecordStore: Send + Sync {
    /// Current record for `(case_id, key)`, if any.
    fn get_field(&self, case_id: &CaseId, key: &str) -> Result<Option<FieldRecord>>;

    /// Insert or overwrite the record for `(record.case_id, record.key)`.
    fn upsert_field(&self, record: &FieldRecord) -> Result<()>;

    /// Like [`RecordStore::upsert_field`], but keep a stored record whose
    /// source is in `protected` (see [`is_protected`]). The check and the
    /// write are one atomic step against the stored row.
    fn upsert_field_unless(&self, record: &FieldRecord, protected: &[Source]) -> Result<UpsertOutcome>;

    /// All records of a case, ordered by key.
    fn list_fields(&self, case_id: &CaseId) -> Result<Vec<FieldRecord>>;

    /// Delete every item of the case, then insert `items`.
    ///
    /// A rejected row is skipped and counted in [`ReplaceOutcome::failed`];
    /// it does not undo the other rows.
    fn replace_items(&self, case_id: &CaseId, items: &[LineItem]) -> Result<ReplaceOutcome>;

    /// All items of a case, ordered by `line_no`.
    fn list_items(&self, case_id: &CaseId) -> Result<Vec<LineItem>>;
}

/// Counters reported after persisting one [`ExtractionResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Fields upserted.
    pub fields_written: usize,
    /// Fields skipped because nothing was extracted.
    pub fields_absent: usize,
    /// Fields skipped because the stored value has a protected source.
    pub fields_protected: usize,
    /// Fields whose write was rejected by the store.
    pub fields_failed: usize,
    /// Items inserted by the table replace.
    pub rows_inserted: usize,
    /// Items rejected by the store.
    pub rows_failed: usize,
}

impl WriteSummary {
    /// Add another summary's counters to this one.
    pub fn absorb(&mut self, other: &WriteSummary) {
        self.fields_written += other.fields_written;
        self.fields_absent += other.fields_absent;
        self.fields_protected += other.fields_protected;
        self.fields_failed += other.fields_failed;
        self.rows_inserted += other.rows_inserted;
        self.rows_failed += other.rows_failed;
    }

    /// Whether any single write failed.
    pub fn has_failures(&self) -> bool {
        self.fields_failed > 0 || self.rows_failed > 0
    }
}

/// Commits extraction results to a [`RecordStore`].
///
/// Never aborts half-way: each failed write is logged, counted and skipped.
pub struct PersistenceWriter<'a> {
    store: &'a dyn RecordStore,
    protected_sources: Vec<Source>,
}

impl<'a> PersistenceWriter<'a> {
    /// Writer that overwrites stored values with the given sources only when
    /// the new record comes from the same source.
    pub fn new(store: &'a dyn RecordStore, protected_sources: Vec<Source>) -> Self {
        Self {
            store,
            protected_sources,
        }
    }

    pub fn from_config(store: &'a dyn RecordStore, config: &StoreConfig) -> Self {
        Self::new(store, config.protected_sources.clone())
    }

    /// Upsert every present field, then replace the item table.
    pub fn write(&self, result: &ExtractionResult) -> WriteSummary {
        let mut summary = WriteSummary::default();

        for record in &result.fields {
            self.write_field(record, &mut summary);
        }

        match self.store.replace_items(&result.case_id, &result.items) {
            Ok(outcome) => {
                summary.rows_inserted = outcome.inserted;
                summary.rows_failed = outcome.failed;
            }
            Err(e) => {
                warn!("Replacing items for case {} failed: {}", result.case_id, e);
                summary.rows_failed = result.items.len();
            }
        }

        info!(
            "Persisted case {}: {} fields written, {} protected, {} failed; {} rows inserted, {} failed",
            result.case_id,
            summary.fields_written,
            summary.fields_protected,
            summary.fields_failed,
            summary.rows_inserted,
            summary.rows_failed
        );

        summary
    }

    fn write_field(&self, record: &FieldRecord, summary: &mut WriteSummary) {
        if record.value.is_absent() {
            debug!("Field {} absent, leaving stored value", record.key);
            summary.fields_absent += 1;
            return;
        }

        match self.store.upsert_field_unless(record, &self.protected_sources) {
            Ok(UpsertOutcome::Written) => summary.fields_written += 1,
            Ok(UpsertOutcome::Protected(source)) => {
                warn!(
                    "Field {} of case {} was written by {}, not overwriting",
                    record.key, record.case_id, source
                );
                summary.fields_protected += 1;
            }
            Err(e) => {
                warn!("Writing field {} of case {} failed: {}", record.key, record.case_id, e);
                summary.fields_failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{Diagnostics, FieldValue};
    use pretty_assertions::assert_eq;

    fn field(key: &str, value: FieldValue, source: Source) -> FieldRecord {
        FieldRecord::new(CaseId::new("c1"), key, value, 0.85, source, "test")
    }

    fn result(fields: Vec<FieldRecord>, items: Vec<LineItem>) -> ExtractionResult {
        ExtractionResult {
            case_id: CaseId::new("c1"),
            fields,
            items,
            total: None,
            diagnostics: Diagnostics::default(),
            preview: Vec::new(),
        }
    }

    fn item(line_no: u32) -> LineItem {
        LineItem {
            case_id: CaseId::new("c1"),
            line_no,
            code: None,
            description: format!("item {}", line_no),
            qty: None,
            value_raw: None,
            value_num: None,
        }
    }

    /// Store that rejects writes to one key.
    struct FailingStore {
        inner: MemoryStore,
        failing_key: &'static str,
    }

    impl RecordStore for FailingStore {
        fn get_field(&self, case_id: &CaseId, key: &str) -> Result<Option<FieldRecord>> {
            self.inner.get_field(case_id, key)
        }

        fn upsert_field(&self, record: &FieldRecord) -> Result<()> {
            self.inner.upsert_field(record)
        }

        fn upsert_field_unless(&self, record: &FieldRecord, protected: &[Source]) -> Result<UpsertOutcome> {
            if record.key == self.failing_key {
                return Err(StoreError::Query("disk full".to_string()));
            }
            self.inner.upsert_field_unless(record, protected)
        }

        fn list_fields(&self, case_id: &CaseId) -> Result<Vec<FieldRecord>> {
            self.inner.list_fields(case_id)
        }

        fn replace_items(&self, _case_id: &CaseId, _items: &[LineItem]) -> Result<ReplaceOutcome> {
            Err(StoreError::Query("table locked".to_string()))
        }

        fn list_items(&self, case_id: &CaseId) -> Result<Vec<LineItem>> {
            self.inner.list_items(case_id)
        }
    }

    /// Store where an admin edit lands after the pass started but before
    /// its write reaches the row.
    struct AdminEditsFirst {
        inner: MemoryStore,
    }

    impl RecordStore for AdminEditsFirst {
        fn get_field(&self, case_id: &CaseId, key: &str) -> Result<Option<FieldRecord>> {
            self.inner.get_field(case_id, key)
        }

        fn upsert_field(&self, record: &FieldRecord) -> Result<()> {
            self.inner.upsert_field(record)
        }

        fn upsert_field_unless(&self, record: &FieldRecord, protected: &[Source]) -> Result<UpsertOutcome> {
            let edit = field(&record.key, FieldValue::text("Maria S."), Source::Admin);
            self.inner.upsert_field(&edit)?;
            self.inner.upsert_field_unless(record, protected)
        }

        fn list_fields(&self, case_id: &CaseId) -> Result<Vec<FieldRecord>> {
            self.inner.list_fields(case_id)
        }

        fn replace_items(&self, case_id: &CaseId, items: &[LineItem]) -> Result<ReplaceOutcome> {
            self.inner.replace_items(case_id, items)
        }

        fn list_items(&self, case_id: &CaseId) -> Result<Vec<LineItem>> {
            self.inner.list_items(case_id)
        }
    }

    #[test]
    fn test_is_protected() {
        let protected = [Source::Admin];
        assert!(is_protected(&Source::Admin, &Source::Ocr, &protected));
        assert!(!is_protected(&Source::Admin, &Source::Admin, &protected));
        assert!(!is_protected(&Source::Vendor, &Source::Ocr, &protected));
        assert!(!is_protected(&Source::Admin, &Source::Ocr, &[]));
    }

    #[test]
    fn test_admin_edit_racing_the_write_is_kept() {
        let store = AdminEditsFirst {
            inner: MemoryStore::new(),
        };
        let writer = PersistenceWriter::new(&store, vec![Source::Admin]);
        let summary = writer.write(&result(
            vec![field("name", FieldValue::text("Marla Silva"), Source::Ocr)],
            vec![],
        ));

        assert_eq!(summary.fields_protected, 1);
        assert_eq!(summary.fields_written, 0);
        let stored = store.get_field(&CaseId::new("c1"), "name").unwrap().unwrap();
        assert_eq!(stored.source, Source::Admin);
        assert_eq!(stored.value, FieldValue::text("Maria S."));
    }

    #[test]
    fn test_absent_value_does_not_overwrite() {
        let store = MemoryStore::new();
        let writer = PersistenceWriter::new(&store, Vec::new());

        writer.write(&result(
            vec![field("cpf", FieldValue::text("12345678901"), Source::Ocr)],
            vec![],
        ));
        let summary = writer.write(&result(vec![field("cpf", FieldValue::Null, Source::Ocr)], vec![]));

        assert_eq!(summary.fields_absent, 1);
        assert_eq!(summary.fields_written, 0);
        let stored = store.get_field(&CaseId::new("c1"), "cpf").unwrap().unwrap();
        assert_eq!(stored.value, FieldValue::text("12345678901"));
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryStore::new();
        let writer = PersistenceWriter::new(&store, Vec::new());
        writer.write(&result(vec![field("name", FieldValue::text("Ana"), Source::Ocr)], vec![]));
        writer.write(&result(vec![field("name", FieldValue::text("Bia"), Source::Ocr)], vec![]));

        let fields = store.list_fields(&CaseId::new("c1")).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, FieldValue::text("Bia"));
    }

    #[test]
    fn test_protected_source_is_kept() {
        let store = MemoryStore::new();
        store
            .upsert_field(&field("name", FieldValue::text("Maria S."), Source::Admin))
            .unwrap();

        let writer = PersistenceWriter::new(&store, vec![Source::Admin]);
        let summary = writer.write(&result(
            vec![
                field("name", FieldValue::text("Marla Silva"), Source::Ocr),
                field("phone", FieldValue::text("11987654321"), Source::Ocr),
            ],
            vec![],
        ));

        assert_eq!(summary.fields_protected, 1);
        assert_eq!(summary.fields_written, 1);
        let stored = store.get_field(&CaseId::new("c1"), "name").unwrap().unwrap();
        assert_eq!(stored.source, Source::Admin);
        assert_eq!(stored.value, FieldValue::text("Maria S."));
    }

    #[test]
    fn test_unprotected_source_is_overwritten() {
        let store = MemoryStore::new();
        store
            .upsert_field(&field("name", FieldValue::text("Old"), Source::Vendor))
            .unwrap();

        let writer = PersistenceWriter::new(&store, vec![Source::Admin]);
        let summary = writer.write(&result(vec![field("name", FieldValue::text("New"), Source::Ocr)], vec![]));

        assert_eq!(summary.fields_written, 1);
        let stored = store.get_field(&CaseId::new("c1"), "name").unwrap().unwrap();
        assert_eq!(stored.source, Source::Ocr);
    }

    #[test]
    fn test_item_replace_is_destructive() {
        let store = MemoryStore::new();
        let writer = PersistenceWriter::new(&store, Vec::new());
        writer.write(&result(vec![], (1..=5).map(item).collect()));
        assert_eq!(store.list_items(&CaseId::new("c1")).unwrap().len(), 5);

        let summary = writer.write(&result(vec![], vec![]));
        assert_eq!(summary.rows_inserted, 0);
        assert!(store.list_items(&CaseId::new("c1")).unwrap().is_empty());
    }

    #[test]
    fn test_failed_writes_are_counted_and_skipped() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            failing_key: "email",
        };
        let writer = PersistenceWriter::new(&store, Vec::new());
        let summary = writer.write(&result(
            vec![
                field("email", FieldValue::text("a@b.com"), Source::Ocr),
                field("name", FieldValue::text("Ana"), Source::Ocr),
            ],
            vec![item(1), item(2)],
        ));

        assert_eq!(
            summary,
            WriteSummary {
                fields_written: 1,
                fields_absent: 0,
                fields_protected: 0,
                fields_failed: 1,
                rows_inserted: 0,
                rows_failed: 2,
            }
        );
        assert!(summary.has_failures());
        assert!(store.get_field(&CaseId::new("c1"), "name").unwrap().is_some());
    }

    #[test]
    fn test_absorb() {
        let mut total = WriteSummary::default();
        let one = WriteSummary {
            fields_written: 3,
            rows_inserted: 2,
            ..Default::default()
        };
        total.absorb(&one);
        total.absorb(&one);
        assert_eq!(total.fields_written, 6);
        assert_eq!(total.rows_inserted, 4);
        assert!(!total.has_failures());
    }
}
