//! Remembered service and equipment-model details, used to prefill forms.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Details shared by every acta for the same hospital service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_code: Option<String>,
}

/// Details shared by every unit of the same equipment model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl ServiceRecord {
    const FIELDS: [&'static str; 6] = [
        "manager",
        "unit",
        "floor",
        "hole",
        "center_name",
        "center_code",
    ];

    fn from_record(record: &Record) -> Self {
        let get = |field| record.text(field).ok().flatten();
        Self {
            manager: get("manager"),
            unit: get("unit"),
            floor: get("floor"),
            hole: get("hole"),
            center_name: get("center_name"),
            center_code: get("center_code"),
        }
    }

    fn values(&self) -> [Option<&str>; 6] {
        [
            self.manager.as_deref(),
            self.unit.as_deref(),
            self.floor.as_deref(),
            self.hole.as_deref(),
            self.center_name.as_deref(),
            self.center_code.as_deref(),
        ]
    }
}

impl ModelRecord {
    const FIELDS: [&'static str; 4] = ["description", "brand", "provider", "contact"];

    fn from_record(record: &Record) -> Self {
        let get = |field| record.text(field).ok().flatten();
        Self {
            description: get("description"),
            brand: get("brand"),
            provider: get("provider"),
            contact: get("contact"),
        }
    }

    fn values(&self) -> [Option<&str>; 4] {
        [
            self.description.as_deref(),
            self.brand.as_deref(),
            self.provider.as_deref(),
            self.contact.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRecord>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelRecord>,
}

/// The single JSON blob the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    pub defaults: Defaults,
    /// Members this version does not know about, kept across writes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryDocument {
    /// Remembers the service and model entries of a submitted record,
    /// replacing whatever was stored under the same keys.
    pub fn learn(&mut self, record: &Record) {
        if let Some(service) = record.text("service").ok().flatten() {
            self.defaults
                .services
                .insert(service, ServiceRecord::from_record(record));
        }
        if let Some(model) = record.text("model").ok().flatten() {
            self.defaults
                .models
                .insert(model, ModelRecord::from_record(record));
        }
    }

    /// Copies the remembered details of the record's service and model into
    /// it. A stored non-empty value replaces whatever the field held; empty
    /// stored values leave the field alone. Returns how many fields changed.
    pub fn autofill(&self, record: &mut Record) -> usize {
        let mut filled = 0;
        let service = record.text("service").ok().flatten();
        if let Some(entry) = service.and_then(|s| self.defaults.services.get(&s)) {
            filled += fill(record, &ServiceRecord::FIELDS, &entry.values());
        }
        let model = record.text("model").ok().flatten();
        if let Some(entry) = model.and_then(|m| self.defaults.models.get(&m)) {
            filled += fill(record, &ModelRecord::FIELDS, &entry.values());
        }
        filled
    }
}

fn fill(record: &mut Record, fields: &[&str], values: &[Option<&str>]) -> usize {
    let mut filled = 0;
    for (field, value) in fields.iter().zip(values) {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        if record.get(field).and_then(Value::as_str) != Some(value) {
            record.set(*field, value);
            filled += 1;
        }
    }
    filled
}

/// Persistence for the [`MemoryDocument`].
pub trait RecordStore: Send + Sync {
    fn get(&self) -> Result<MemoryDocument, StoreError>;
    fn put(&self, document: &MemoryDocument) -> Result<(), StoreError>;
    /// Short label reported to clients.
    fn mode(&self) -> &'static str;
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: Mutex<MemoryDocument>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryStore {
    fn get(&self) -> Result<MemoryDocument, StoreError> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn put(&self, document: &MemoryDocument) -> Result<(), StoreError> {
        let mut guard = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = document.clone();
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "local"
    }
}

/// One JSON file on disk, replaced atomically on every write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self) -> Result<MemoryDocument, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no store file yet, using defaults");
                return Ok(MemoryDocument::default());
            }
            Err(err) => return Err(self.io_err(err)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn put(&self, document: &MemoryDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)?;
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| self.io_err(err))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|err| self.io_err(err))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| self.io_err(err))?;
        tracing::debug!(
            path = %self.path.display(),
            services = document.defaults.services.len(),
            models = document.defaults.models.len(),
            "store flushed"
        );
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submitted() -> Record {
        Record::from_value(json!({
            "service": "Radiología",
            "manager": "Dra. Etxeberria",
            "unit": "RX",
            "floor": "2",
            "hole": "",
            "center_name": "POLICLINICA GIPUZKOA",
            "center_code": "PG01",
            "model": "Vivid E95",
            "description": "Ecógrafo",
            "brand": "GE",
            "provider": "GE Healthcare",
            "contact": "soporte@example.com"
        }))
        .expect("object")
    }

    #[test]
    fn empty_document_serializes_with_empty_defaults() {
        let value = serde_json::to_value(MemoryDocument::default()).expect("json");
        assert_eq!(value, json!({ "defaults": { "services": {}, "models": {} } }));
        let parsed: MemoryDocument = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(parsed, MemoryDocument::default());
    }

    #[test]
    fn unknown_members_survive_a_round_trip() {
        let raw = json!({
            "defaults": { "services": {}, "models": {} },
            "updated_by": "admin"
        });
        let doc: MemoryDocument = serde_json::from_value(raw.clone()).expect("parse");
        assert_eq!(serde_json::to_value(&doc).expect("json"), raw);
    }

    #[test]
    fn learn_keys_entries_by_service_and_model() {
        let mut doc = MemoryDocument::default();
        doc.learn(&submitted());

        let service = &doc.defaults.services["Radiología"];
        assert_eq!(service.manager.as_deref(), Some("Dra. Etxeberria"));
        assert_eq!(service.hole, None);
        assert_eq!(service.center_code.as_deref(), Some("PG01"));

        let model = &doc.defaults.models["Vivid E95"];
        assert_eq!(model.brand.as_deref(), Some("GE"));
    }

    #[test]
    fn learn_skips_records_without_keys() {
        let mut doc = MemoryDocument::default();
        doc.learn(&Record::new().with("manager", "nobody"));
        assert_eq!(doc, MemoryDocument::default());
    }

    #[test]
    fn autofill_prefers_remembered_values() {
        let mut doc = MemoryDocument::default();
        doc.learn(&submitted());

        let mut fresh = Record::from_value(json!({
            "service": "Radiología",
            "manager": "Sustituto",
            "floor": "",
            "model": "Vivid E95"
        }))
        .expect("object");
        let filled = doc.autofill(&mut fresh);

        assert_eq!(
            fresh.text("manager").expect("text").as_deref(),
            Some("Dra. Etxeberria")
        );
        assert_eq!(fresh.text("floor").expect("text").as_deref(), Some("2"));
        assert_eq!(fresh.text("hole").expect("text"), None);
        assert_eq!(fresh.text("brand").expect("text").as_deref(), Some("GE"));
        // 5 non-empty service fields + 4 model fields
        assert_eq!(filled, 9);
    }

    #[test]
    fn empty_remembered_values_keep_the_form_value() {
        let mut doc = MemoryDocument::default();
        doc.learn(&submitted());

        let mut fresh = Record::from_value(json!({
            "service": "Radiología",
            "hole": "H-12",
            "unit": "RX"
        }))
        .expect("object");
        let filled = doc.autofill(&mut fresh);

        assert_eq!(fresh.text("hole").expect("text").as_deref(), Some("H-12"));
        assert_eq!(fresh.text("unit").expect("text").as_deref(), Some("RX"));
        // manager, floor, center_name, center_code
        assert_eq!(filled, 4);
        assert_eq!(doc.autofill(&mut fresh), 0);
    }

    #[test]
    fn autofill_without_matches_is_a_no_op() {
        let doc = MemoryDocument::default();
        let mut record = Record::new().with("service", "Urgencias");
        assert_eq!(doc.autofill(&mut record), 0);
        assert_eq!(record, Record::new().with("service", "Urgencias"));
    }

    #[test]
    fn in_memory_store_reports_local_mode() {
        let store = InMemoryStore::new();
        assert_eq!(store.mode(), "local");
        assert_eq!(store.get().expect("get"), MemoryDocument::default());

        let mut doc = MemoryDocument::default();
        doc.learn(&submitted());
        store.put(&doc).expect("put");
        assert_eq!(store.get().expect("get"), doc);
    }

    #[test]
    fn file_store_starts_empty_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("memory.json");
        let store = JsonFileStore::new(&path);
        assert_eq!(store.mode(), "file");
        assert_eq!(store.get().expect("missing"), MemoryDocument::default());

        let mut doc = MemoryDocument::default();
        doc.learn(&submitted());
        store.put(&doc).expect("put");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get().expect("get"), doc);
    }

    #[test]
    fn corrupt_store_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");
        std::fs::write(&path, b"{ not json").expect("write");
        let err = JsonFileStore::new(&path).get().expect_err("corrupt");
        assert!(matches!(err, StoreError::Json(_)));
    }
}
