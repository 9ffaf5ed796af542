use serde::{Deserialize, Serialize};

use crate::error::ErrorBody;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummaryRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Failed,
}

/// Result of one summary function invocation. Requests refused before
/// generation starts are answered with a plain error body instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub status: GenerationStatus,
    pub summary: Option<String>,
    pub error: Option<ErrorBody>,
}

impl SummaryResponse {
    pub fn completed(summary: String) -> Self {
        Self {
            status: GenerationStatus::Completed,
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failed(error: ErrorBody) -> Self {
        Self {
            status: GenerationStatus::Failed,
            summary: None,
            error: Some(error),
        }
    }
}
