//! Flat-file certificate store: one JSON array in a single data file.
//!
//! Meant for running without a database at hand. `init` creates the file
//! once at startup; reads and writes after that assume it exists. A mutex
//! serializes whole-file read-modify-write cycles, which is plenty at the
//! expected scale ("last write wins" is the stated durability bar).

use super::CertificateStore;
use chrono::Utc;
use common::model::certificate::CertificateRecord;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<CertificateRecord>, String> {
        let data = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_str(&data).map_err(|e| e.to_string())
    }

    fn write_all(&self, records: &[CertificateRecord]) -> Result<(), String> {
        let data = serde_json::to_string_pretty(records).map_err(|e| e.to_string())?;
        fs::write(&self.path, data).map_err(|e| e.to_string())
    }
}

impl CertificateStore for JsonFileStore {
    fn init(&self) -> Result<(), String> {
        if !self.path.exists() {
            fs::write(&self.path, "[]").map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn save(&self, records: &[CertificateRecord]) -> Result<usize, String> {
        if records.is_empty() {
            return Ok(0);
        }
        let _guard = self
            .lock
            .lock()
            .map_err(|_| "certificate store mutex poisoned".to_string())?;
        let mut stored = self.read_all()?;
        let existing: HashSet<&str> = stored.iter().map(|r| r.id.as_str()).collect();
        let mut fresh: Vec<CertificateRecord> = records
            .iter()
            .filter(|r| !existing.contains(r.id.as_str()))
            .cloned()
            .collect();
        let accepted = fresh.len();
        if accepted == 0 {
            return Ok(0);
        }
        let now = Utc::now();
        for record in &mut fresh {
            record.created_at = Some(record.created_at.unwrap_or(now));
        }
        stored.extend(fresh);
        self.write_all(&stored)?;
        Ok(accepted)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, String> {
        Ok(self.read_all()?.into_iter().find(|r| r.id == id))
    }

    fn list_all(&self) -> Result<Vec<CertificateRecord>, String> {
        let mut records = self.read_all()?;
        // Reverse first so that, under the stable sort, records written in the
        // same instant come out latest-inserted first.
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, name: &str) -> CertificateRecord {
        CertificateRecord {
            id: id.to_string(),
            name: name.to_string(),
            verify_link: format!("http://localhost:8080/verify?id={}", id),
            issued_at: "2026-08-31T10:00:00Z".to_string(),
            issuer: "Certify".to_string(),
            template_id: None,
            recipient_email: Some("someone@example.com".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn init_creates_the_data_file_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(&path);
        store.init().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");

        // A second init must not clobber existing data.
        store.save(&[record("keep", "Keep")]).unwrap();
        store.init().unwrap();
        assert!(store.get_by_id("keep").unwrap().is_some());
    }

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        store.init().unwrap();
        let original = record("cert-9", "Grace Hopper");
        assert_eq!(store.save(&[original.clone()]).unwrap(), 1);
        let fetched = store.get_by_id("cert-9").unwrap().unwrap();
        assert_eq!(fetched.name, original.name);
        assert_eq!(fetched.verify_link, original.verify_link);
        assert_eq!(fetched.recipient_email, original.recipient_email);
        assert!(fetched.created_at.is_some());
    }

    #[test]
    fn duplicates_are_skipped_not_overwritten() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        store.init().unwrap();
        store.save(&[record("x", "Original")]).unwrap();
        assert_eq!(store.save(&[record("x", "Imposter")]).unwrap(), 0);
        assert_eq!(store.get_by_id("x").unwrap().unwrap().name, "Original");
    }

    #[test]
    fn list_all_orders_by_recency() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        store.init().unwrap();
        store.save(&[record("t1", "One")]).unwrap();
        store.save(&[record("t2", "Two")]).unwrap();
        store.save(&[record("t3", "Three")]).unwrap();
        let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }
}
