use serde::{Deserialize, Serialize};

use super::progress::{SyncReport, SyncState};

/// Ответ GET /sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,

    /// Причина пропуска: "already_running" или "nothing_to_load"
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skipped: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub report: Option<SyncReport>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn completed(report: SyncReport) -> Self {
        Self {
            success: true,
            skipped: None,
            report: Some(report),
            error: None,
        }
    }

    pub fn skipped(reason: impl Into<String>, report: Option<SyncReport>) -> Self {
        Self {
            success: true,
            skipped: Some(reason.into()),
            report,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: None,
            report: None,
            error: Some(error.into()),
        }
    }
}

/// Ответ GET /sync/status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub state: SyncState,
    pub last_run: Option<SyncReport>,
}
