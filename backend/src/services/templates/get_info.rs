use crate::state::UploadsState;
use actix_web::{web, HttpResponse, Responder};
use common::model::design::DesignConfig;

/// Returns dimensions and default overlay positions for an uploaded template,
/// so the design step can be re-entered without re-uploading the image.
pub(crate) async fn process(
    template_id: web::Path<String>,
    state: web::Data<UploadsState>,
) -> impl Responder {
    let templates = state.templates.read().await;
    match templates.get(template_id.as_str()) {
        Some(template) => HttpResponse::Ok().json(serde_json::json!({
            "template_id": template_id.as_str(),
            "width": template.width,
            "height": template.height,
            "design": DesignConfig::default_for(template.width as f64, template.height as f64),
        })),
        None => HttpResponse::NotFound().body("Template not found"),
    }
}
