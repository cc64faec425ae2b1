//! Batch certificate generation.
//!
//! This is the heart of the system: one job turns an uploaded dataset, a
//! column mapping and a design config into a zip of rendered PDF
//! certificates, one persisted `CertificateRecord` per row, and (optionally)
//! one email per selected recipient.
//!
//! Routes:
//! - `POST /api/generate/start`: validates the inputs, schedules the batch as
//!   a background job and immediately returns a `job_id` for polling.
//! - `GET /api/generate/status/{job_id}`: current `JobStatus`, including the
//!   final summary (counts and download path) once completed.
//! - `GET /api/generate/download/{job_id}`: the finished `certificates.zip`.
//!
//! Rendering is strictly sequential and all-or-nothing: any per-row failure
//! fails the whole batch and nothing is persisted. Email delivery, by
//! contrast, is per-row and independent; failures are counted, never fatal.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod download;
pub(crate) mod email;
mod fonts;
mod qr;
pub(crate) mod render;
mod start;
mod status;

const API_PATH: &str = "/api/generate";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/start", post().to(start::process))
        .route("/status/{job_id}", get().to(status::process))
        .route("/download/{job_id}", get().to(download::process))
}
