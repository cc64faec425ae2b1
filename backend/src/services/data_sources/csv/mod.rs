//! CSV data source endpoints.
//!
//! A dataset is the first step of the certificate flow: the client uploads a
//! recipient CSV here, and the response carries the parsed headers plus a
//! best-guess column mapping for the mapping step to start from.
//!
//! Routes:
//! - `POST /api/data_sources/csv/upload`: multipart upload of a `.csv` file.
//!   The whole file is parsed up front; any malformed row rejects the upload
//!   (no partial import). Returns `dataset_id`, `headers`, `row_count` and
//!   `suggested_mapping`.

use actix_web::web::{post, scope};
use actix_web::Scope;

mod upload;

const API_PATH: &str = "/api/data_sources/csv";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/upload", post().to(upload::process))
}
