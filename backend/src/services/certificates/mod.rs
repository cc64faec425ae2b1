//! Issued-certificate read endpoints.
//!
//! Routes:
//! - `GET /api/certificates`: every issued record, newest first. Backs the
//!   admin dashboard; no pagination (full-list return is fine at the
//!   expected scale).
//! - `GET /api/certificates/{id}`: one record by id.
//! - `GET /verify?id={id}` (mounted at the root in `main.rs`): the public
//!   verification lookup. The query-parameter shape is a contract (it is
//!   what every issued QR code points at) and must not change.

use crate::storage::CertificateStore;
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Responder, Scope};
use serde::Deserialize;

const API_PATH: &str = "/api/certificates";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("/{id}", get().to(get_by_id))
}

async fn list(store: web::Data<dyn CertificateStore>) -> impl Responder {
    match store.list_all() {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Failed to list certificates: {}", e);
            HttpResponse::ServiceUnavailable().body("Certificate store unavailable")
        }
    }
}

async fn get_by_id(
    id: web::Path<String>,
    store: web::Data<dyn CertificateStore>,
) -> impl Responder {
    lookup(&id, &store)
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub id: String,
}

/// Handler for the public `GET /verify?id=` lookup.
pub async fn verify(
    query: web::Query<VerifyQuery>,
    store: web::Data<dyn CertificateStore>,
) -> impl Responder {
    lookup(&query.id, &store)
}

fn lookup(id: &str, store: &web::Data<dyn CertificateStore>) -> HttpResponse {
    match store.get_by_id(id) {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().body("Certificate not found"),
        Err(e) => {
            log::error!("Certificate lookup failed: {}", e);
            HttpResponse::ServiceUnavailable().body("Certificate store unavailable")
        }
    }
}
