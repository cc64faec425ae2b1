//! Template image endpoints.
//!
//! A template is the certificate background: one raster image whose pixel
//! dimensions define the page size of every generated document.
//!
//! Routes:
//! - `POST /api/templates/upload`: multipart upload of a PNG or JPEG image.
//!   The format is detected from the leading bytes (uploads often carry no
//!   reliable type metadata). Returns `template_id`, the pixel dimensions and
//!   a default `DesignConfig` proportional to the image, which the design
//!   step uses as its starting overlay positions.
//! - `GET /api/templates/{template_id}`: re-fetches dimensions and defaults
//!   for a previously uploaded template.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod get_info;
mod upload;

const API_PATH: &str = "/api/templates";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/upload", post().to(upload::process))
        .route("/{template_id}", get().to(get_info::process))
}
