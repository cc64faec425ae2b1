use crate::services::generate::render::sniff_format;
use crate::state::{TemplateImage, UploadsState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::design::DesignConfig;
use futures_util::StreamExt;
use image::GenericImageView;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) async fn process(state: web::Data<UploadsState>, payload: Multipart) -> impl Responder {
    match upload_template(state, payload).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

async fn upload_template(
    state: web::Data<UploadsState>,
    mut payload: Multipart,
) -> Result<serde_json::Value, String> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| e.to_string())?;
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if field_name.as_deref() == Some("file") {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                bytes.extend_from_slice(&chunk.map_err(|e| e.to_string())?);
            }
            file_bytes = Some(bytes);
        }
    }

    let bytes = file_bytes.ok_or("Missing file")?;
    let format = sniff_format(&bytes);
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| format!("Not a valid PNG or JPEG image: {}", e))?;
    let (width, height) = decoded.dimensions();

    let template = TemplateImage {
        bytes,
        format,
        width,
        height,
    };
    let design = DesignConfig::default_for(width as f64, height as f64);

    let template_id = Uuid::new_v4().to_string();
    let summary = serde_json::json!({
        "template_id": template_id,
        "width": width,
        "height": height,
        "design": design,
    });
    state
        .templates
        .write()
        .await
        .insert(template_id, Arc::new(template));

    Ok(summary)
}
