use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sole durable entity: one issued certificate.
///
/// Written exactly once by the batch generator, then only ever read (the
/// verification endpoint and the admin list). There is no update path.
/// Field names serialize in camelCase to stay wire-compatible with the
/// records already issued by earlier revisions of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    /// Random UUID allocated at issuance time; the primary lookup key.
    pub id: String,
    /// Recipient display name.
    pub name: String,
    /// `{baseUrl}/verify?id={id}`, the URL encoded into the QR code.
    pub verify_link: String,
    /// RFC 3339 timestamp, set once at generation time.
    pub issued_at: String,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    /// Storage-assigned insertion time, used for newest-first ordering.
    /// `None` until the record has been persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
