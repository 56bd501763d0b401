//! Job lifecycle client for the sponsor-detection analysis service.
//!
//! Submits a match video (upload or remote URL), polls the created job at a
//! fixed cadence, and fetches and aggregates the sponsor report once the job
//! completes. [`JobLifecycleController`] ties the three together.

pub mod api;
pub mod client;
pub mod controller;
pub mod error;
pub mod poll;
pub mod report;
pub mod submit;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::AnalysisApi;
pub use client::{AnalysisClient, DEFAULT_BASE_URL};
pub use controller::{
    FailureReason, JobLifecycleController, LifecycleError, LifecycleEvent, LifecycleState,
    Transition,
};
pub use error::ClientError;
pub use poll::{JobPoller, PollTransientError, PollUpdate, StatusTracker, DEFAULT_POLL_INTERVAL};
pub use report::{AggregatedReport, ReportAggregator, ReportFetchError};
pub use submit::{JobSubmitter, SubmissionError, SubmitError, ValidationError, VideoFile, VideoInput};
pub use types::JobStatusInfo;
