//! In-process record store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{is_protected, RecordStore, ReplaceOutcome, Result, UpsertOutcome};
use crate::error::StoreError;
use crate::models::record::{CaseId, FieldRecord, LineItem, Source};

#[derive(Debug, Default)]
struct Tables {
    fields: HashMap<CaseId, BTreeMap<String, FieldRecord>>,
    items: HashMap<CaseId, Vec<LineItem>>,
}

/// Record store kept in memory, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RecordStore for MemoryStore {
    fn get_field(&self, case_id: &CaseId, key: &str) -> Result<Option<FieldRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .fields
            .get(case_id)
            .and_then(|fields| fields.get(key))
            .cloned())
    }

    fn upsert_field(&self, record: &FieldRecord) -> Result<()> {
        self.upsert_field_unless(record, &[]).map(|_| ())
    }

    fn upsert_field_unless(&self, record: &FieldRecord, protected: &[Source]) -> Result<UpsertOutcome> {
        let mut tables = self.lock()?;
        let fields = tables.fields.entry(record.case_id.clone()).or_default();
        if let Some(existing) = fields.get(&record.key) {
            if is_protected(&existing.source, &record.source, protected) {
                return Ok(UpsertOutcome::Protected(existing.source.clone()));
            }
        }
        fields.insert(record.key.clone(), record.clone());
        Ok(UpsertOutcome::Written)
    }

    fn list_fields(&self, case_id: &CaseId) -> Result<Vec<FieldRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .fields
            .get(case_id)
            .map(|fields| fields.values().cloned().collect())
            .unwrap_or_default())
    }

    fn replace_items(&self, case_id: &CaseId, items: &[LineItem]) -> Result<ReplaceOutcome> {
        let mut tables = self.lock()?;
        let mut kept: Vec<LineItem> = Vec::with_capacity(items.len());
        let mut failed = 0;

        for item in items {
            if kept.iter().any(|k| k.line_no == item.line_no) {
                failed += 1;
                continue;
            }
            kept.push(item.clone());
        }
        kept.sort_by_key(|i| i.line_no);

        let inserted = kept.len();
        tables.items.insert(case_id.clone(), kept);
        Ok(ReplaceOutcome { inserted, failed })
    }

    fn list_items(&self, case_id: &CaseId) -> Result<Vec<LineItem>> {
        let tables = self.lock()?;
        Ok(tables.items.get(case_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FieldValue;

    fn item(case: &str, line_no: u32) -> LineItem {
        LineItem {
            case_id: CaseId::new(case),
            line_no,
            code: Some(format!("C{}", line_no)),
            description: "x".to_string(),
            qty: Some(1),
            value_raw: None,
            value_num: None,
        }
    }

    #[test]
    fn test_fields_are_keyed_per_case() {
        let store = MemoryStore::new();
        for case in ["a", "b"] {
            let r = FieldRecord::new(case.into(), "name", FieldValue::text(case), 0.9, Source::Ocr, "t");
            store.upsert_field(&r).unwrap();
        }
        let a = store.list_fields(&CaseId::new("a")).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].value, FieldValue::text("a"));
        assert!(store.get_field(&CaseId::new("c"), "name").unwrap().is_none());
    }

    #[test]
    fn test_guarded_upsert_keeps_protected_record() {
        let store = MemoryStore::new();
        let admin = FieldRecord::new("a".into(), "name", FieldValue::text("Ana"), 1.0, Source::Admin, "adm");
        store.upsert_field(&admin).unwrap();

        let ocr = FieldRecord::new("a".into(), "name", FieldValue::text("Aria"), 0.85, Source::Ocr, "t");
        let outcome = store.upsert_field_unless(&ocr, &[Source::Admin]).unwrap();
        assert_eq!(outcome, UpsertOutcome::Protected(Source::Admin));
        assert_eq!(
            store.get_field(&"a".into(), "name").unwrap().unwrap().value,
            FieldValue::text("Ana")
        );

        let fix = FieldRecord::new("a".into(), "name", FieldValue::text("Ana B."), 1.0, Source::Admin, "adm");
        assert_eq!(store.upsert_field_unless(&fix, &[Source::Admin]).unwrap(), UpsertOutcome::Written);
    }

    #[test]
    fn test_replace_items_rejects_duplicate_line_numbers() {
        let store = MemoryStore::new();
        let outcome = store
            .replace_items(&CaseId::new("a"), &[item("a", 2), item("a", 1), item("a", 2)])
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome { inserted: 2, failed: 1 });

        let numbers: Vec<u32> = store
            .list_items(&CaseId::new("a"))
            .unwrap()
            .iter()
            .map(|i| i.line_no)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_replace_leaves_other_cases_alone() {
        let store = MemoryStore::new();
        store.replace_items(&CaseId::new("a"), &[item("a", 1)]).unwrap();
        store.replace_items(&CaseId::new("b"), &[item("b", 1)]).unwrap();
        store.replace_items(&CaseId::new("a"), &[]).unwrap();

        assert!(store.list_items(&CaseId::new("a")).unwrap().is_empty());
        assert_eq!(store.list_items(&CaseId::new("b")).unwrap().len(), 1);
    }
}
