use crate::model::design::DesignConfig;
use crate::model::mapping::CsvColumnMapping;
use serde::{Deserialize, Serialize};

/// Request payload for `POST /api/generate/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGenerateRequest {
    /// Dataset returned by the CSV upload endpoint.
    pub dataset_id: String,
    /// Template image returned by the template upload endpoint.
    pub template_id: String,
    pub mapping: CsvColumnMapping,
    pub design: DesignConfig,
    /// Present when the batch should also send each certificate by email.
    #[serde(default)]
    pub email: Option<EmailOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOptions {
    pub subject: String,
    pub body: String,
    /// 0-based row indices to send to. `None` means every row.
    #[serde(default)]
    pub selected_rows: Option<Vec<usize>>,
}

/// Request payload for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub org_id: String,
    pub password: String,
}
