//! Job identity and status lifecycle.
//!
//! A [`Job`] moves along `pending → processing → {completed, error}`. The two
//! terminal statuses are sticky: once observed, [`Job::observe_status`]
//! refuses every further change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::report::Report;
use crate::CoreError;

/// Opaque identifier assigned by the analysis service when a job is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Analysis status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Position in the lifecycle chain. Both terminal statuses share a rank.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    ///
    /// Repeating a non-terminal status is allowed; anything after a terminal
    /// status is not.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis run as tracked by the client.
///
/// `status` is `None` until the first status response arrives. `report` is
/// only ever set on a completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    status: Option<JobStatus>,
    report: Option<Report>,
}

impl Job {
    #[must_use]
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: None,
            report: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    #[must_use]
    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }

    /// Records a newly observed status.
    ///
    /// Returns `false` (leaving the job untouched) when the status would move
    /// backwards or the job is already terminal.
    pub fn observe_status(&mut self, next: JobStatus) -> bool {
        match self.status {
            Some(current) if !current.can_advance_to(next) => false,
            _ => {
                self.status = Some(next);
                true
            }
        }
    }

    /// Attaches the fetched report.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReportWithoutCompletion`] unless the job has been
    /// observed as [`JobStatus::Completed`].
    pub fn attach_report(&mut self, report: Report) -> Result<(), CoreError> {
        match self.status {
            Some(JobStatus::Completed) => {
                self.report = Some(report);
                Ok(())
            }
            status => Err(CoreError::ReportWithoutCompletion {
                job_id: self.id.clone(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_deserializes_from_lowercase() {
        let status: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, JobStatus::Processing);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(serde_json::from_str::<JobStatus>("\"queued\"").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn job_accepts_forward_and_repeated_statuses() {
        let mut job = Job::new(JobId::from("j1"));
        assert!(job.observe_status(JobStatus::Pending));
        assert!(job.observe_status(JobStatus::Pending));
        assert!(job.observe_status(JobStatus::Processing));
        assert!(job.observe_status(JobStatus::Completed));
        assert_eq!(job.status(), Some(JobStatus::Completed));
    }

    #[test]
    fn job_may_skip_straight_to_terminal() {
        let mut job = Job::new(JobId::from("j1"));
        assert!(job.observe_status(JobStatus::Error));
        assert!(job.is_terminal());
    }

    #[test]
    fn job_refuses_regression() {
        let mut job = Job::new(JobId::from("j1"));
        job.observe_status(JobStatus::Processing);
        assert!(!job.observe_status(JobStatus::Pending));
        assert_eq!(job.status(), Some(JobStatus::Processing));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut job = Job::new(JobId::from("j1"));
        job.observe_status(JobStatus::Completed);
        assert!(!job.observe_status(JobStatus::Processing));
        assert!(!job.observe_status(JobStatus::Error));
        assert!(!job.observe_status(JobStatus::Completed));
        assert_eq!(job.status(), Some(JobStatus::Completed));
    }

    #[test]
    fn report_requires_completed_status() {
        let mut job = Job::new(JobId::from("j1"));
        job.observe_status(JobStatus::Processing);
        let err = job.attach_report(Report::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReportWithoutCompletion {
                status: Some(JobStatus::Processing),
                ..
            }
        ));
        assert!(job.report().is_none());
    }

    #[test]
    fn report_on_unpolled_job_has_no_status() {
        let mut job = Job::new(JobId::from("j1"));
        let err = job.attach_report(Report::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReportWithoutCompletion { status: None, .. }
        ));
        assert_eq!(
            err.to_string(),
            "job j1 is not yet polled; a report requires a completed job"
        );
    }

    #[test]
    fn report_attaches_to_completed_job() {
        let mut job = Job::new(JobId::from("j1"));
        job.observe_status(JobStatus::Completed);
        job.attach_report(Report::default()).unwrap();
        assert!(job.report().is_some());
    }
}
