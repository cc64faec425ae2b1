use crate::state::{Dataset, UploadsState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::mapping::CsvColumnMapping;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// HTTP handler wrapper that converts the internal result to an `HttpResponse`.
///
/// - On success: `200 OK` with the dataset summary as JSON.
/// - On failure: `400 Bad Request` with the error message; the step does not advance.
pub(crate) async fn process(state: web::Data<UploadsState>, payload: Multipart) -> impl Responder {
    match upload_dataset(state, payload).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

async fn upload_dataset(
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
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                .unwrap_or_default();
            if !filename.to_lowercase().ends_with(".csv") {
                return Err("The file must end with .csv".to_string());
            }

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                bytes.extend_from_slice(&chunk.map_err(|e| e.to_string())?);
            }
            file_bytes = Some(bytes);
        }
    }

    let bytes = file_bytes.ok_or("Missing file")?;
    let dataset = parse_rows(&bytes)?;
    let suggested = CsvColumnMapping::suggest(&dataset.headers);

    let dataset_id = Uuid::new_v4().to_string();
    let summary = serde_json::json!({
        "dataset_id": dataset_id,
        "headers": dataset.headers,
        "row_count": dataset.rows.len(),
        "suggested_mapping": suggested,
    });
    state
        .datasets
        .write()
        .await
        .insert(dataset_id, Arc::new(dataset));

    Ok(summary)
}

/// Parses the raw upload into header names plus one map per data row,
/// header order preserved. Any malformed row aborts the import.
fn parse_rows(bytes: &[u8]) -> Result<Dataset, String> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Could not read CSV header: {}", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err("CSV file has no header row".to_string());
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("Malformed CSV at data row {}: {}", i + 1, e))?;
        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.trim().to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Dataset { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows_in_order() {
        let csv = b"Name,Email,Design\nAda,ada@example.com,gold\nGrace,grace@example.com,silver\n";
        let dataset = parse_rows(csv).unwrap();
        assert_eq!(dataset.headers, vec!["Name", "Email", "Design"]);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.rows[0]["Name"], "Ada");
        assert_eq!(dataset.rows[1]["Email"], "grace@example.com");
    }

    #[test]
    fn malformed_rows_abort_the_import() {
        // Second data row has the wrong number of fields.
        let csv = b"Name,Email\nAda,ada@example.com\nBroken,row,extra,fields\n";
        assert!(parse_rows(csv).is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(parse_rows(b"").is_err());
    }
}
