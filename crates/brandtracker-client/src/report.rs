//! Fetching the report of a completed job and deriving its aggregates.

use std::sync::Arc;

use brandtracker_core::{AggregateView, CoreError, JobId, Report};
use thiserror::Error;

use crate::api::AnalysisApi;
use crate::error::ClientError;

/// The report of a completed job could not be retrieved or is unusable.
#[derive(Debug, Error)]
pub enum ReportFetchError {
    #[error("failed to fetch report for job {job_id}: {source}")]
    Fetch {
        job_id: JobId,
        #[source]
        source: ClientError,
    },

    #[error("report for job {job_id} is invalid: {source}")]
    Invalid {
        job_id: JobId,
        #[source]
        source: CoreError,
    },
}

impl ReportFetchError {
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Fetch { job_id, .. } | Self::Invalid { job_id, .. } => job_id,
        }
    }
}

/// A validated report together with its derived view.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReport {
    pub report: Report,
    pub view: AggregateView,
}

impl AggregatedReport {
    #[must_use]
    pub fn new(report: Report) -> Self {
        let view = AggregateView::from_report(&report);
        Self { report, view }
    }
}

pub struct ReportAggregator<A> {
    api: Arc<A>,
}

impl<A> Clone for ReportAggregator<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: AnalysisApi> ReportAggregator<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Fetches and aggregates the report for a job observed as completed.
    ///
    /// Rows are kept in the order the service sent them. A report that breaks
    /// the ordering contract is logged but still accepted, since the top
    /// sponsor is computed without relying on that order.
    ///
    /// # Errors
    ///
    /// - [`ReportFetchError::Fetch`] on network, HTTP-status, or decode failure.
    /// - [`ReportFetchError::Invalid`] if a row has an empty sponsor name or a
    ///   negative duration/timestamp.
    pub async fn fetch(&self, job_id: &JobId) -> Result<AggregatedReport, ReportFetchError> {
        let rows = self
            .api
            .fetch_report(job_id)
            .await
            .map_err(|source| ReportFetchError::Fetch {
                job_id: job_id.clone(),
                source,
            })?;

        let report = Report::new(rows).map_err(|source| ReportFetchError::Invalid {
            job_id: job_id.clone(),
            source,
        })?;

        if !report.follows_ordering_contract() {
            tracing::warn!(
                job_id = %job_id,
                "report rows are not sorted by duration; top sponsor computed independently"
            );
        }

        let aggregated = AggregatedReport::new(report);
        tracing::info!(
            job_id = %job_id,
            brands = aggregated.view.unique_brand_count,
            detections = aggregated.view.total_detections,
            "report aggregated"
        );
        Ok(aggregated)
    }
}
