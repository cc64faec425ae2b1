//! Persistence gateway for issued certificates.
//!
//! One polymorphic capability (save / get_by_id / list_all) with
//! interchangeable backends selected at composition time in `main.rs`.
//! Canonical duplicate semantics across every backend: inserting a record
//! whose id already exists is silently skipped, never an error and never an
//! overwrite, and `save` reports how many records were actually new.

use crate::config::{Config, StorageBackend};
use common::model::certificate::CertificateRecord;
use std::sync::Arc;

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

pub trait CertificateStore: Send + Sync {
    /// One-time initialization (schema creation, data file creation), invoked
    /// explicitly at startup rather than implicitly on first access.
    fn init(&self) -> Result<(), String>;

    /// Inserts the batch, skipping any record whose id is already stored.
    /// Returns the number of newly inserted records; 0 is a valid outcome.
    fn save(&self, records: &[CertificateRecord]) -> Result<usize, String>;

    fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, String>;

    /// All records, newest first by storage-assigned creation time.
    fn list_all(&self) -> Result<Vec<CertificateRecord>, String>;
}

/// Builds the backend named by the configuration.
pub fn open(config: &Config) -> Result<Arc<dyn CertificateStore>, String> {
    match config.storage {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.sqlite_path)?)),
        StorageBackend::JsonFile => Ok(Arc::new(JsonFileStore::new(&config.data_file))),
    }
}
