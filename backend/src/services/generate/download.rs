use crate::state::UploadsState;
use actix_web::{web, HttpResponse, Responder};

/// Serves the finished batch archive. The archive exists once the job's
/// render phase succeeded, even if persistence later failed.
pub(crate) async fn process(
    job_id: web::Path<String>,
    state: web::Data<UploadsState>,
) -> impl Responder {
    let archives = state.archives.read().await;
    match archives.get(job_id.as_str()) {
        Some(archive) => HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"certificates.zip\"",
            ))
            .body(archive.as_ref().clone()),
        None => HttpResponse::NotFound().body("No archive for that job"),
    }
}
