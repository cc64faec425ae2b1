//! Admin login: a single-factor password gate.
//!
//! `POST /api/auth/login` compares the submitted organization id against the
//! configured constant and the password against `ADMIN_PASSWORD`, and answers
//! with a bare boolean. Deliberately nothing more: no sessions, no tokens, no
//! lockout, and no hint about which factor was wrong.

use crate::config::Config;
use actix_web::web::{post, scope};
use actix_web::{web, HttpResponse, Responder, Scope};
use common::requests::LoginRequest;

const API_PATH: &str = "/api/auth";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/login", post().to(process))
}

async fn process(config: web::Data<Config>, payload: web::Json<LoginRequest>) -> impl Responder {
    let ok = authenticate(&config, &payload.org_id, &payload.password);
    HttpResponse::Ok().json(serde_json::json!({ "success": ok }))
}

fn authenticate(config: &Config, org_id: &str, password: &str) -> bool {
    let Some(secret) = config.admin_password.as_deref() else {
        log::error!("ADMIN_PASSWORD is not set; admin login is disabled");
        return false;
    };
    org_id == config.admin_org_id && password == secret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;

    fn config(password: Option<&str>) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://127.0.0.1:8080".to_string(),
            issuer: "Certify".to_string(),
            admin_org_id: "certify-admin".to_string(),
            admin_password: password.map(str::to_string),
            smtp: None,
            email_concurrency: 3,
            storage: StorageBackend::Sqlite,
            sqlite_path: "certify.sqlite".to_string(),
            data_file: "data.json".to_string(),
            fonts_dir: "./fonts".to_string(),
        }
    }

    #[test]
    fn both_factors_must_match() {
        let config = config(Some("s3cret"));
        assert!(authenticate(&config, "certify-admin", "s3cret"));
        assert!(!authenticate(&config, "certify-admin", "wrong"));
        assert!(!authenticate(&config, "someone-else", "s3cret"));
    }

    #[test]
    fn missing_password_configuration_always_denies() {
        let config = config(None);
        assert!(!authenticate(&config, "certify-admin", ""));
        assert!(!authenticate(&config, "certify-admin", "anything"));
    }
}
