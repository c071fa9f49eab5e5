use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::SyncError,
    models::{parse_reports, Report},
};

use super::{KeyValueStore, StorageEvents, StoreError};

/// Accessor for the single storage key holding the JSON array of reports.
#[derive(Clone)]
pub struct ReportSlot {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ReportSlot {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw slot contents; an empty value counts as absent.
    pub fn read_raw(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.get_item(&self.key)?.filter(|raw| !raw.is_empty()))
    }

    /// Typed view of the slot. Unreadable records are left out.
    pub fn load(&self) -> Result<Vec<Report>, SyncError> {
        match self.read_raw()? {
            Some(raw) => Ok(parse_reports(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Stored records as written by their producers.
    pub fn load_records(&self) -> Result<Vec<Value>, SyncError> {
        match self.read_raw()? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Appends one record and rewrites the whole array, leaving the existing
    /// records untouched. Returns the new length.
    pub fn append(&self, report: Report) -> Result<usize, SyncError> {
        let mut records = self.load_records()?;
        records.push(serde_json::to_value(&report)?);
        self.write(&records)?;
        Ok(records.len())
    }

    pub fn replace_all(&self, reports: &[Report]) -> Result<(), SyncError> {
        self.write(reports)
    }

    fn write<T: serde::Serialize + ?Sized>(&self, records: &T) -> Result<(), SyncError> {
        let raw = serde_json::to_string(records)?;
        self.store.set_item(&self.key, &raw)?;
        Ok(())
    }

    pub fn subscribe(&self) -> StorageEvents {
        self.store.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn report(id: &str) -> Report {
        Report {
            id: id.to_string(),
            title: format!("Report {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_absent_or_empty_slot() {
        let store = Arc::new(MemoryStore::new());
        let slot = ReportSlot::new(store.clone(), "civicReports");
        assert!(slot.load().unwrap().is_empty());

        store.set_item("civicReports", "").unwrap();
        assert_eq!(slot.read_raw().unwrap(), None);
        assert!(slot.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_keeps_order() {
        let slot = ReportSlot::new(Arc::new(MemoryStore::new()), "civicReports");
        assert_eq!(slot.append(report("a")).unwrap(), 1);
        assert_eq!(slot.append(report("b")).unwrap(), 2);
        assert_eq!(slot.append(report("c")).unwrap(), 3);

        let ids: Vec<String> = slot.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_leaves_existing_records_untouched() {
        let store = Arc::new(MemoryStore::new());
        let existing = serde_json::json!({
            "id": "m1",
            "title": "Fallen tree",
            "timestamp": "2023-11-14T22:13:20.000Z",
            "images": ["a.jpg"],
            "upvotes": 3
        });
        store
            .set_item("civicReports", &serde_json::to_string(&vec![existing.clone()]).unwrap())
            .unwrap();
        let slot = ReportSlot::new(store, "civicReports");

        assert_eq!(slot.append(report("a")).unwrap(), 2);

        let records = slot.load_records().unwrap();
        assert_eq!(records[0], existing);
        assert!(records[0].get("status").is_none());
        assert_eq!(records[1]["id"], "a");
    }

    #[test]
    fn test_load_skips_unreadable_records() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_item("civicReports", r#"[{"id": "a", "user": "nobody"}, {"id": "b"}]"#)
            .unwrap();
        let slot = ReportSlot::new(store, "civicReports");

        let ids: Vec<String> = slot.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(slot.load_records().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_contents() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("civicReports", "{not json").unwrap();
        let slot = ReportSlot::new(store, "civicReports");

        assert!(matches!(slot.load(), Err(SyncError::MalformedReports(_))));
        assert!(matches!(
            slot.append(report("a")),
            Err(SyncError::MalformedReports(_))
        ));
    }
}
