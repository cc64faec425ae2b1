//! `POST /api/generate/start`: schedules one batch generation job.
//!
//! ## Workflow
//!
//! 1. The handler validates the request against the in-memory uploads: the
//!    dataset and template must exist, the name mapping must point at a real
//!    header, and email dispatch requires a configured SMTP account. Input
//!    errors come back as `400` and nothing is scheduled.
//! 2. `schedule_generate_job` registers the job as `Pending`, returns the
//!    `job_id` immediately, and spawns the batch onto the runtime.
//! 3. The render phase runs under `spawn_blocking`, strictly sequential per
//!    row: allocate an id, derive the verification link, render the PDF,
//!    add it to the shared zip, classify the row for email, build the
//!    `CertificateRecord`. Any render error fails the whole batch: nothing
//!    is persisted, the user-facing status is generic, the cause is logged.
//! 4. Back on the async side the finished archive is stashed for download,
//!    queued emails are dispatched under the concurrency cap, and the whole
//!    record batch is persisted in one `save` call. The completed status
//!    carries a JSON summary of all the counts.

use crate::config::Config;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::generate::email::{self, Mailer, PendingEmail};
use crate::services::generate::fonts;
use crate::services::generate::render::{self, RenderContext};
use crate::state::{Dataset, TemplateImage, UploadsState};
use crate::storage::CertificateStore;
use actix_web::{web, HttpResponse, Responder};
use chrono::{SecondsFormat, Utc};
use common::jobs::JobStatus;
use common::model::certificate::CertificateRecord;
use common::requests::{EmailOptions, StartGenerateRequest};
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Progress messages from the blocking render phase to the async listener.
#[derive(Debug)]
enum GenerateUpdate {
    Job(JobStatus),
    Task { row_index: usize, total_rows: usize },
}

/// Everything the blocking phase needs, detached from the shared state.
struct BatchInput {
    dataset: Arc<Dataset>,
    template: Arc<TemplateImage>,
    template_id: String,
    request: StartGenerateRequest,
    base_url: String,
    issuer: String,
    fonts_dir: PathBuf,
}

/// What the blocking phase hands back for the async follow-up.
#[derive(Debug)]
struct BatchOutput {
    archive: Vec<u8>,
    records: Vec<CertificateRecord>,
    pending: Vec<PendingEmail>,
    /// Rows excluded from sending: deselected, or no address present.
    emails_skipped: usize,
    /// Rows with a syntactically invalid address, failed before dispatch.
    emails_invalid: usize,
}

pub(crate) async fn process(
    jobs_state: web::Data<JobsState>,
    uploads: web::Data<UploadsState>,
    store: web::Data<dyn CertificateStore>,
    config: web::Data<Config>,
    payload: web::Json<StartGenerateRequest>,
) -> impl Responder {
    let request = payload.into_inner();

    let dataset = match uploads.datasets.read().await.get(&request.dataset_id) {
        Some(dataset) => dataset.clone(),
        None => return HttpResponse::BadRequest().body("Unknown dataset id"),
    };
    let template = match uploads.templates.read().await.get(&request.template_id) {
        Some(template) => template.clone(),
        None => return HttpResponse::BadRequest().body("Unknown template id"),
    };
    if request.mapping.name.is_empty() {
        return HttpResponse::BadRequest().body("A name column mapping is required");
    }
    if !dataset.headers.contains(&request.mapping.name) {
        return HttpResponse::BadRequest().body(format!(
            "Mapped name column '{}' is not a CSV header",
            request.mapping.name
        ));
    }
    let mailer = if request.email.is_some() {
        match config.smtp.as_ref().map(Mailer::from_config) {
            Some(Ok(mailer)) => Some(mailer),
            Some(Err(e)) => return HttpResponse::BadRequest().body(e),
            None => {
                return HttpResponse::BadRequest()
                    .body("Email dispatch requested but SMTP is not configured")
            }
        }
    } else {
        None
    };

    let input = BatchInput {
        dataset,
        template,
        template_id: request.template_id.clone(),
        request,
        base_url: config.base_url.clone(),
        issuer: config.issuer.clone(),
        fonts_dir: PathBuf::from(&config.fonts_dir),
    };

    let job_id = schedule_generate_job(
        jobs_state,
        uploads,
        store.into_inner(),
        config.email_concurrency,
        mailer,
        input,
    )
    .await;
    HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
}

async fn schedule_generate_job(
    jobs_state: web::Data<JobsState>,
    uploads: web::Data<UploadsState>,
    store: Arc<dyn CertificateStore>,
    email_concurrency: usize,
    mailer: Option<Mailer>,
    input: BatchInput,
) -> String {
    let job_id = Uuid::new_v4().to_string();
    jobs_state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = jobs_state.tx.clone();
    let job_id_clone = job_id.clone();

    tokio::spawn(async move {
        // Dedicated channel for this job; a listener translates its updates
        // into `JobUpdate`s for the central job controller.
        let (gen_tx, mut gen_rx) = mpsc::channel::<GenerateUpdate>(100);
        let listener_tx = tx.clone();
        let listener_job_id = job_id_clone.clone();
        tokio::spawn(async move {
            while let Some(update) = gen_rx.recv().await {
                let status = match update {
                    GenerateUpdate::Job(status) => status,
                    GenerateUpdate::Task {
                        row_index,
                        total_rows,
                    } => {
                        let progress = if total_rows > 0 {
                            ((row_index + 1) as f32 / total_rows as f32 * 100.0) as u32
                        } else {
                            0
                        };
                        JobStatus::InProgress(progress)
                    }
                };
                let _ = listener_tx
                    .send(JobUpdate::new(listener_job_id.clone(), status))
                    .await;
            }
        });

        let job_id_for_blocking = job_id_clone.clone();
        let handle =
            tokio::task::spawn_blocking(move || generate_blocking(gen_tx, &job_id_for_blocking, input));

        let failed_status = match handle.await {
            Ok(Ok((output, email_opts))) => {
                finish_batch(
                    &tx,
                    &uploads,
                    store,
                    email_concurrency,
                    mailer,
                    job_id_clone,
                    output,
                    email_opts,
                )
                .await;
                return;
            }
            Ok(Err(cause)) => {
                // The user gets a generic notice; the root cause stays in the log.
                log::error!("Batch {} failed during rendering: {}", job_id_clone, cause);
                JobStatus::Failed("Certificate generation failed".to_string())
            }
            Err(join_err) => {
                log::error!("Batch {} worker panicked: {}", job_id_clone, join_err);
                JobStatus::Failed("Certificate generation failed".to_string())
            }
        };
        let _ = tx.send(JobUpdate::new(job_id_clone, failed_status)).await;
    });

    job_id
}

/// Email dispatch, persistence and the final summary, after a successful
/// render phase.
#[allow(clippy::too_many_arguments)]
async fn finish_batch(
    tx: &mpsc::Sender<JobUpdate>,
    uploads: &UploadsState,
    store: Arc<dyn CertificateStore>,
    email_concurrency: usize,
    mailer: Option<Mailer>,
    job_id: String,
    output: BatchOutput,
    email_opts: Option<EmailOptions>,
) {
    let total = output.records.len();

    // Stash the archive before persisting: the zip stays downloadable even
    // if the store turns out to be unavailable.
    uploads
        .archives
        .write()
        .await
        .insert(job_id.clone(), Arc::new(output.archive));

    let mut emails_sent = 0usize;
    let mut emails_failed = output.emails_invalid;
    if let (Some(mailer), Some(opts)) = (mailer, email_opts) {
        let (sent, failed) = email::dispatch_all(
            &mailer,
            &opts.subject,
            &opts.body,
            output.pending,
            email_concurrency,
            |percent| {
                let _ = tx.try_send(JobUpdate::new(job_id.clone(), JobStatus::Dispatching(percent)));
            },
        )
        .await;
        emails_sent = sent;
        emails_failed += failed;
    }

    let records = output.records;
    let store_result =
        tokio::task::spawn_blocking(move || store.save(&records)).await;
    let accepted = match store_result {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(cause)) => {
            log::error!("Batch {}: persistence failed: {}", job_id, cause);
            let _ = tx
                .send(JobUpdate::new(
                    job_id,
                    JobStatus::Failed("Failed to persist certificate records".to_string()),
                ))
                .await;
            return;
        }
        Err(join_err) => {
            log::error!("Batch {}: persistence task panicked: {}", job_id, join_err);
            let _ = tx
                .send(JobUpdate::new(
                    job_id,
                    JobStatus::Failed("Failed to persist certificate records".to_string()),
                ))
                .await;
            return;
        }
    };

    let summary = serde_json::json!({
        "total_generated": total,
        "records_accepted": accepted,
        "emails_sent": emails_sent,
        "emails_failed": emails_failed,
        "emails_skipped": output.emails_skipped,
        "download": format!("/api/generate/download/{}", job_id),
    });
    let _ = tx
        .send(JobUpdate::new(
            job_id,
            JobStatus::Completed(summary.to_string()),
        ))
        .await;
}

/// How one row participates in email dispatch.
#[derive(Debug, PartialEq)]
enum Recipient {
    /// Deselected by the user, or no address in the row.
    Skipped,
    /// Address present but not even `local@domain.tld`-shaped; failed
    /// before ever occupying a pool slot.
    Invalid,
    Queued(String),
}

fn classify_recipient(
    selected: Option<&HashSet<usize>>,
    row_index: usize,
    address: Option<&str>,
) -> Recipient {
    if selected.is_some_and(|set| !set.contains(&row_index)) {
        return Recipient::Skipped;
    }
    match address {
        None | Some("") => Recipient::Skipped,
        Some(addr) if !email::is_valid_email(addr) => Recipient::Invalid,
        Some(addr) => Recipient::Queued(addr.to_string()),
    }
}

/// Replaces every character outside `[a-zA-Z0-9]` with `_`, keeping archive
/// entry names filesystem-safe on every platform.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// The synchronous batch body, run via `spawn_blocking`: loads the fonts,
/// builds the render context and hands the per-row loop a real renderer.
fn generate_blocking(
    tx: mpsc::Sender<GenerateUpdate>,
    job_id: &str,
    input: BatchInput,
) -> Result<(BatchOutput, Option<EmailOptions>), String> {
    let fonts = fonts::load(&input.fonts_dir)?;
    let ctx = RenderContext {
        template_bytes: &input.template.bytes,
        template_format: input.template.format,
        width: input.template.width as f64,
        height: input.template.height as f64,
        design: &input.request.design,
        fonts: &fonts,
    };
    render_batch(&tx, job_id, &input, |name, verify_link, id| {
        render::render_certificate(&ctx, name, verify_link, id).map_err(|e| e.to_string())
    })
}

/// Renders every row through `render_row` into the shared zip and accumulates
/// records and pending deliveries. One archive entry and one record per data
/// row; any row error aborts the whole batch.
fn render_batch(
    tx: &mpsc::Sender<GenerateUpdate>,
    job_id: &str,
    input: &BatchInput,
    render_row: impl Fn(&str, &str, &str) -> Result<Vec<u8>, String>,
) -> Result<(BatchOutput, Option<EmailOptions>), String> {
    let _ = tx.blocking_send(GenerateUpdate::Job(JobStatus::InProgress(0)));

    let mapping = &input.request.mapping;
    let email_opts = input.request.email.clone();
    let selected: Option<HashSet<usize>> = email_opts
        .as_ref()
        .and_then(|opts| opts.selected_rows.as_ref())
        .map(|rows| rows.iter().copied().collect());

    let total_rows = input.dataset.rows.len();
    let mut zip_writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let zip_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut records = Vec::with_capacity(total_rows);
    let mut pending = Vec::new();
    let mut emails_skipped = 0usize;
    let mut emails_invalid = 0usize;

    for (row_index, row) in input.dataset.rows.iter().enumerate() {
        let name = row
            .get(&mapping.name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                format!(
                    "Row {}: missing value for name column '{}'",
                    row_index + 1,
                    mapping.name
                )
            })?;

        let id = Uuid::new_v4().to_string();
        let verify_link = format!("{}/verify?id={}", input.base_url, id);

        let pdf = render_row(name, &verify_link, &id)
            .map_err(|e| format!("Row {}: render failed: {}", row_index + 1, e))?;

        let filename = format!("{}_{}.pdf", sanitize_name(name), &id[..8]);
        zip_writer
            .start_file(filename.as_str(), zip_options)
            .map_err(|e| e.to_string())?;
        zip_writer.write_all(&pdf).map_err(|e| e.to_string())?;

        let address = mapping
            .email
            .as_ref()
            .and_then(|col| row.get(col))
            .map(String::as_str)
            .filter(|v| !v.is_empty());

        if email_opts.is_some() {
            match classify_recipient(selected.as_ref(), row_index, address) {
                Recipient::Skipped => emails_skipped += 1,
                Recipient::Invalid => emails_invalid += 1,
                Recipient::Queued(addr) => pending.push(PendingEmail {
                    row_index,
                    address: addr,
                    filename: filename.clone(),
                    pdf: pdf.clone(),
                }),
            }
        }

        // The design column, when mapped and filled, records which template
        // variant the row asked for; otherwise the uploaded template's id.
        let template_id = if mapping.design.is_empty() {
            Some(input.template_id.clone())
        } else {
            row.get(&mapping.design)
                .filter(|v| !v.is_empty())
                .cloned()
                .or_else(|| Some(input.template_id.clone()))
        };

        records.push(CertificateRecord {
            id,
            name: name.to_string(),
            verify_link,
            issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            issuer: input.issuer.clone(),
            template_id,
            recipient_email: address.map(str::to_string),
            created_at: None,
        });

        let _ = tx.blocking_send(GenerateUpdate::Task {
            row_index,
            total_rows,
        });
    }

    let archive = zip_writer
        .finish()
        .map_err(|e| format!("Failed to finalize archive for job {}: {}", job_id, e))?
        .into_inner();

    Ok((
        BatchOutput {
            archive,
            records,
            pending,
            emails_skipped,
            emails_invalid,
        },
        email_opts,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::design::DesignConfig;
    use common::model::mapping::CsvColumnMapping;
    use std::collections::HashMap;

    fn batch_input(rows: Vec<HashMap<String, String>>) -> BatchInput {
        BatchInput {
            dataset: Arc::new(Dataset {
                headers: vec!["Name".to_string()],
                rows,
            }),
            template: Arc::new(TemplateImage {
                bytes: vec![0u8; 4],
                format: image::ImageFormat::Png,
                width: 800,
                height: 600,
            }),
            template_id: "tmpl-1".to_string(),
            request: StartGenerateRequest {
                dataset_id: "ds-1".to_string(),
                template_id: "tmpl-1".to_string(),
                mapping: CsvColumnMapping {
                    name: "Name".to_string(),
                    ..Default::default()
                },
                design: DesignConfig::default_for(800.0, 600.0),
                email: None,
            },
            base_url: "http://localhost:8080".to_string(),
            issuer: "Certify".to_string(),
            fonts_dir: PathBuf::from("./fonts"),
        }
    }

    fn name_rows(names: &[&str]) -> Vec<HashMap<String, String>> {
        names
            .iter()
            .map(|name| HashMap::from([("Name".to_string(), name.to_string())]))
            .collect()
    }

    #[test]
    fn every_row_yields_one_archive_entry_and_one_record() {
        let input = batch_input(name_rows(&["Ada Lovelace", "Grace Hopper", "Alan Turing"]));
        let (tx, mut rx) = mpsc::channel(16);

        let (output, email_opts) = render_batch(&tx, "job-1", &input, |name, link, _id| {
            Ok(format!("{}|{}", name, link).into_bytes())
        })
        .unwrap();

        assert!(email_opts.is_none());
        assert_eq!(output.records.len(), 3);
        for record in &output.records {
            assert_eq!(
                record.verify_link,
                format!("http://localhost:8080/verify?id={}", record.id)
            );
            assert_eq!(record.issuer, "Certify");
            assert_eq!(record.template_id.as_deref(), Some("tmpl-1"));
        }

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(output.archive)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut first = String::new();
        std::io::Read::read_to_string(&mut archive.by_index(0).unwrap(), &mut first).unwrap();
        assert!(first.starts_with("Ada Lovelace|"));

        // One progress message per row, after the initial zero.
        let mut task_updates = 0;
        while let Ok(update) = rx.try_recv() {
            if matches!(update, GenerateUpdate::Task { .. }) {
                task_updates += 1;
            }
        }
        assert_eq!(task_updates, 3);
    }

    #[test]
    fn a_missing_name_value_fails_the_whole_batch() {
        let mut rows = name_rows(&["Ada"]);
        rows.push(HashMap::from([("Name".to_string(), String::new())]));
        let input = batch_input(rows);
        let (tx, _rx) = mpsc::channel(16);

        let err = render_batch(&tx, "job-2", &input, |_, _, _| Ok(vec![1])).unwrap_err();
        assert!(err.contains("Row 2"));
    }

    #[test]
    fn a_render_error_aborts_instead_of_persisting_partial_results() {
        let input = batch_input(name_rows(&["Ada", "Grace"]));
        let (tx, _rx) = mpsc::channel(16);

        let result = render_batch(&tx, "job-3", &input, |name, _, _| {
            if name == "Grace" {
                Err("corrupt template".to_string())
            } else {
                Ok(vec![1])
            }
        });
        assert!(result.unwrap_err().contains("render failed"));
    }

    #[test]
    fn sanitization_replaces_everything_outside_ascii_alphanumerics() {
        assert_eq!(sanitize_name("Ada Lovelace"), "Ada_Lovelace");
        assert_eq!(sanitize_name("Ann-Marie O'Neil"), "Ann_Marie_O_Neil");
        assert_eq!(sanitize_name("José"), "Jos_");
        assert_eq!(sanitize_name("x9"), "x9");
    }

    #[test]
    fn invalid_addresses_fail_before_dispatch() {
        // Ten rows, three with a malformed address, the rest valid: exactly
        // three must be marked failed up front and never queued.
        let addresses = [
            Some("a@example.com"),
            Some("broken"),
            Some("b@example.com"),
            Some("also-broken"),
            Some("c@example.com"),
            Some("d@example.com"),
            Some("no@tld"),
            Some("e@example.com"),
            Some("f@example.com"),
            Some("g@example.com"),
        ];
        let mut queued = 0;
        let mut invalid = 0;
        for (i, addr) in addresses.iter().enumerate() {
            match classify_recipient(None, i, *addr) {
                Recipient::Queued(_) => queued += 1,
                Recipient::Invalid => invalid += 1,
                Recipient::Skipped => {}
            }
        }
        assert_eq!(invalid, 3);
        assert_eq!(queued, 7);
    }

    #[test]
    fn deselected_and_addressless_rows_are_skipped() {
        let selected: HashSet<usize> = [0, 2].into_iter().collect();
        assert_eq!(
            classify_recipient(Some(&selected), 1, Some("fine@example.com")),
            Recipient::Skipped
        );
        assert_eq!(classify_recipient(Some(&selected), 0, None), Recipient::Skipped);
        assert_eq!(classify_recipient(Some(&selected), 2, Some("")), Recipient::Skipped);
        assert_eq!(
            classify_recipient(Some(&selected), 2, Some("fine@example.com")),
            Recipient::Queued("fine@example.com".to_string())
        );
    }

    #[test]
    fn selection_is_checked_before_address_validity() {
        // A deselected row with a bad address counts as skipped, not failed.
        let selected: HashSet<usize> = HashSet::new();
        assert_eq!(
            classify_recipient(Some(&selected), 0, Some("broken")),
            Recipient::Skipped
        );
    }
}
