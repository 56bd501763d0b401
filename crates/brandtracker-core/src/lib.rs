pub mod app_config;
pub mod config;
pub mod job;
pub mod report;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use job::{Job, JobId, JobStatus};
pub use report::{AggregateView, Report, SponsorRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid sponsor record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// `status` is `None` when the job has never been polled.
    #[error(
        "job {job_id} is {}; a report requires a completed job",
        .status.map_or("not yet polled", JobStatus::as_str)
    )]
    ReportWithoutCompletion {
        job_id: JobId,
        status: Option<JobStatus>,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
