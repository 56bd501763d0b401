//! Wire types for the analysis service.
//!
//! The service is loose about a few shapes: job ids arrive as JSON integers
//! or strings, and the report endpoint answers `{status, message}` instead of
//! a sponsor list while a job is still running.

use brandtracker_core::{JobId, JobStatus, SponsorRecord};
use serde::{Deserialize, Serialize};

/// A job id as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for JobId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => JobId::new(s),
            WireId::Number(n) => JobId::new(n.to_string()),
        }
    }
}

/// Body of `POST /upload-url`.
#[derive(Debug, Serialize)]
pub struct CreateFromUrlRequest<'a> {
    pub url: &'a str,
}

/// Response of both job-creation endpoints.
#[derive(Debug, Deserialize)]
pub struct CreateJobResponse {
    pub id: WireId,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// Response of `GET /videos/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Response of `GET /videos/{id}/report`.
#[derive(Debug, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub sponsors: Option<Vec<SponsorRecord>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status plus the descriptive extras the service returns alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusInfo {
    pub status: JobStatus,
    pub filename: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl From<StatusResponse> for JobStatusInfo {
    fn from(resp: StatusResponse) -> Self {
        Self {
            status: resp.status,
            filename: resp.filename,
            duration_seconds: resp.duration,
        }
    }
}
