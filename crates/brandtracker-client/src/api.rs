//! The seam between the job lifecycle and the analysis service.

use std::future::Future;

use brandtracker_core::{JobId, JobStatus, SponsorRecord};

use crate::error::ClientError;
use crate::submit::VideoInput;

/// Operations the lifecycle needs from the analysis service.
///
/// [`crate::AnalysisClient`] implements this over HTTP; tests substitute
/// scripted fakes.
pub trait AnalysisApi: Send + Sync + 'static {
    /// Creates one job. Each call creates a distinct job.
    fn create_job(
        &self,
        input: &VideoInput,
    ) -> impl Future<Output = Result<JobId, ClientError>> + Send;

    fn job_status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<JobStatus, ClientError>> + Send;

    /// Fetches the raw report rows in the order the service sent them.
    fn fetch_report(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<Vec<SponsorRecord>, ClientError>> + Send;
}
