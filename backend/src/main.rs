mod config;
mod job_controller;
mod services;
mod state;
mod storage;

use crate::config::Config;
use crate::job_controller::state::JobsState;
use crate::state::UploadsState;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::from_env();

    // The store is built once here and injected everywhere; its lifetime is
    // the process lifetime, with schema/data-file creation done up front.
    let store = storage::open(&config).map_err(std::io::Error::other)?;
    store.init().map_err(std::io::Error::other)?;
    let store_data: web::Data<dyn storage::CertificateStore> = web::Data::from(store);

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState {
        jobs: Arc::new(RwLock::new(HashMap::new())),
        tx,
    };

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let uploads = UploadsState::new();
    let bind_addr = (config.host.clone(), config.port);
    info!("Server running at {}", config.base_url);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(uploads.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(store_data.clone())
            .service(services::data_sources::csv::configure_routes())
            .service(services::templates::configure_routes())
            .service(services::generate::configure_routes())
            .service(services::certificates::configure_routes())
            .service(services::auth::configure_routes())
            .route("/verify", web::get().to(services::certificates::verify))
    })
    .bind(bind_addr)?
    .run()
    .await
}
