//! Process configuration, read once from the environment at startup.
//!
//! Everything configurable lives here: bind address, the public base URL that
//! verification links are derived from, the issuer label stamped into every
//! record, the admin credentials, the SMTP account for email dispatch, and
//! the storage backend selection. The resulting `Config` is owned by `main`
//! and injected into handlers via `web::Data`; no globals, no lazy caches.

use std::env;

/// Default organization identifier accepted by the admin login.
const DEFAULT_ORG_ID: &str = "certify-admin";

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    /// Sender mailbox, e.g. `"Certify" <no-reply@example.com>`.
    pub from: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    JsonFile,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Origin used to derive `{base_url}/verify?id={id}` links. Must match
    /// the publicly reachable address or issued QR codes will not resolve.
    pub base_url: String,
    pub issuer: String,
    pub admin_org_id: String,
    /// Missing means the admin login always denies.
    pub admin_password: Option<String>,
    /// `None` when the SMTP environment is incomplete; starting a batch with
    /// email enabled is then rejected up front.
    pub smtp: Option<SmtpConfig>,
    /// Maximum simultaneously in-flight email deliveries.
    pub email_concurrency: usize,
    pub storage: StorageBackend,
    pub sqlite_path: String,
    pub data_file: String,
    pub fonts_dir: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let host = env_or("HOST", "127.0.0.1");
        let port = env_or("PORT", "8080").parse().unwrap_or(8080);
        let base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));
        let base_url = base_url.trim_end_matches('/').to_string();

        let smtp = match (env::var("SMTP_HOST"), env::var("SMTP_USER"), env::var("SMTP_PASS")) {
            (Ok(smtp_host), Ok(user), Ok(pass)) => Some(SmtpConfig {
                host: smtp_host,
                port: env_or("SMTP_PORT", "587").parse().unwrap_or(587),
                user,
                pass,
                from: env_or("SMTP_FROM", "\"Certify\" <no-reply@example.com>"),
            }),
            _ => None,
        };

        let storage = match env_or("STORAGE_BACKEND", "sqlite").to_lowercase().as_str() {
            "json" => StorageBackend::JsonFile,
            _ => StorageBackend::Sqlite,
        };

        Config {
            host,
            port,
            base_url,
            issuer: env_or("ISSUER", "Certify"),
            admin_org_id: env_or("ADMIN_ORG_ID", DEFAULT_ORG_ID),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            smtp,
            email_concurrency: env_or("EMAIL_CONCURRENCY", "3").parse().unwrap_or(3),
            storage,
            sqlite_path: env_or("DATABASE_PATH", "certify.sqlite"),
            data_file: env_or("DATA_FILE", "data.json"),
            fonts_dir: env_or("FONTS_DIR", "./fonts"),
        }
    }
}
