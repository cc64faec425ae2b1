//! In-memory state for the upload -> map -> design -> generate flow.
//!
//! Uploaded datasets and template images are transient working material, not
//! durable entities, so they live in shared maps for the lifetime of the
//! process (only issued `CertificateRecord`s go through the storage layer).
//! Finished zip archives are parked here too. None of the maps evict:
//! retention is bounded by the process lifetime, which is fine at the
//! expected batch sizes, and keeping archives around means a finished batch
//! stays re-downloadable even after its job status has been read.

use image::ImageFormat;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A parsed CSV upload: header order preserved, one map per data row.
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// An uploaded certificate background image.
pub struct TemplateImage {
    pub bytes: Vec<u8>,
    /// Format detected from the leading bytes, never from metadata.
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Default)]
pub struct UploadsState {
    pub datasets: Arc<RwLock<HashMap<String, Arc<Dataset>>>>,
    pub templates: Arc<RwLock<HashMap<String, Arc<TemplateImage>>>>,
    /// Finished batch archives, keyed by job id.
    pub archives: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl UploadsState {
    pub fn new() -> Self {
        Self::default()
    }
}
