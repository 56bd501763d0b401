//! The job lifecycle state machine.
//!
//! [`JobLifecycleController`] drives one job at a time through
//! `Idle → Submitting → Polling → {Reporting, Failed}` and back to `Idle` on
//! [`JobLifecycleController::reset`]. Background work (the poller and the
//! report fetch) never touches the state directly: it sends
//! [`LifecycleEvent`] messages over a per-job channel, and
//! [`LifecycleState::apply`] decides whether each one still applies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use brandtracker_core::{AggregateView, Job, JobId, JobStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::AnalysisApi;
use crate::poll::{JobPoller, PollTransientError, PollUpdate};
use crate::report::{AggregatedReport, ReportAggregator, ReportFetchError};
use crate::submit::{JobSubmitter, SubmitError, ValidationError, VideoInput};

const EVENT_BUFFER: usize = 16;

/// Why a job ended in [`LifecycleState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The creation request failed; no job exists.
    Submission(String),
    /// The service reported `status = error`.
    Analysis,
    /// The job completed but its report could not be used.
    ReportFetch(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submission(detail) => write!(f, "failed to submit video: {detail}"),
            Self::Analysis => f.write_str("the analysis service reported an error"),
            Self::ReportFetch(detail) => write!(f, "failed to load the report: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    Submitting,
    Polling { job: Job },
    Reporting { job: Job, view: AggregateView },
    Failed {
        job_id: Option<JobId>,
        reason: FailureReason,
    },
}

/// A message from background work about one job.
#[derive(Debug)]
pub enum LifecycleEvent {
    Status { job_id: JobId, status: JobStatus },
    PollWarning(PollTransientError),
    ReportReady { job_id: JobId, report: AggregatedReport },
    ReportFailed(ReportFetchError),
}

impl From<PollUpdate> for LifecycleEvent {
    fn from(update: PollUpdate) -> Self {
        match update {
            PollUpdate::Status { job_id, status } => Self::Status { job_id, status },
            PollUpdate::Warning(err) => Self::PollWarning(err),
        }
    }
}

impl LifecycleEvent {
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Status { job_id, .. } | Self::ReportReady { job_id, .. } => job_id,
            Self::PollWarning(err) => &err.job_id,
            Self::ReportFailed(err) => err.job_id(),
        }
    }
}

/// What applying one event did.
#[derive(Debug)]
pub enum Transition {
    /// A non-terminal status was accepted; still polling.
    InProgress(JobStatus),
    /// `completed` was observed; the report fetch should start.
    FetchingReport,
    /// A single status query failed; state unchanged.
    Warning(PollTransientError),
    /// Now in [`LifecycleState::Reporting`].
    Reported,
    /// Now in [`LifecycleState::Failed`].
    Failed,
    /// The event was stale, out of order, or for another job.
    Ignored,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a job is already active (state: {state}); reset before submitting another")]
    Busy { state: &'static str },
}

impl LifecycleState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling { .. } => "polling",
            Self::Reporting { .. } => "reporting",
            Self::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Polling { job } | Self::Reporting { job, .. } => Some(job.id()),
            Self::Failed { job_id, .. } => job_id.as_ref(),
            Self::Idle | Self::Submitting => None,
        }
    }

    /// `Reporting` and `Failed` only leave via reset.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Reporting { .. } | Self::Failed { .. })
    }

    fn polls(&self, job_id: &JobId) -> bool {
        matches!(self, Self::Polling { job } if job.id() == job_id && !job.is_terminal())
    }

    fn awaits_report(&self, job_id: &JobId) -> bool {
        matches!(
            self,
            Self::Polling { job } if job.id() == job_id && job.status() == Some(JobStatus::Completed)
        )
    }

    /// Applies one event.
    ///
    /// Events for a job other than the one being polled, statuses that would
    /// move backwards, and anything arriving after a terminal status are
    /// ignored without changing the state.
    pub fn apply(&mut self, event: LifecycleEvent) -> Transition {
        match event {
            LifecycleEvent::Status { job_id, status } => self.apply_status(&job_id, status),
            LifecycleEvent::PollWarning(err) if self.polls(&err.job_id) => Transition::Warning(err),
            LifecycleEvent::ReportReady { job_id, report } if self.awaits_report(&job_id) => {
                self.settle_report(job_id, report)
            }
            LifecycleEvent::ReportFailed(err) if self.awaits_report(err.job_id()) => {
                *self = Self::Failed {
                    job_id: Some(err.job_id().clone()),
                    reason: FailureReason::ReportFetch(err.to_string()),
                };
                Transition::Failed
            }
            _ => Transition::Ignored,
        }
    }

    fn apply_status(&mut self, job_id: &JobId, status: JobStatus) -> Transition {
        let Self::Polling { job } = self else {
            return Transition::Ignored;
        };
        if job.id() != job_id || !job.observe_status(status) {
            return Transition::Ignored;
        }

        match status {
            JobStatus::Pending | JobStatus::Processing => Transition::InProgress(status),
            JobStatus::Completed => Transition::FetchingReport,
            JobStatus::Error => {
                *self = Self::Failed {
                    job_id: Some(job_id.clone()),
                    reason: FailureReason::Analysis,
                };
                Transition::Failed
            }
        }
    }

    fn settle_report(&mut self, job_id: JobId, report: AggregatedReport) -> Transition {
        let mut job = match std::mem::replace(self, Self::Idle) {
            Self::Polling { job } => job,
            other => {
                *self = other;
                return Transition::Ignored;
            }
        };
        let AggregatedReport { report, view } = report;

        match job.attach_report(report) {
            Ok(()) => {
                *self = Self::Reporting { job, view };
                Transition::Reported
            }
            Err(err) => {
                *self = Self::Failed {
                    job_id: Some(job_id),
                    reason: FailureReason::ReportFetch(err.to_string()),
                };
                Transition::Failed
            }
        }
    }
}

/// Resources owned by the job currently being tracked.
///
/// Dropping it cancels the token and aborts its tasks, so no timer or request
/// outlives the transition that released it.
struct ActiveJob {
    job_id: JobId,
    cancel: CancellationToken,
    events_tx: mpsc::Sender<LifecycleEvent>,
    events: mpsc::Receiver<LifecycleEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Submits a video, polls its job, and fetches its report.
pub struct JobLifecycleController<A> {
    submitter: JobSubmitter<A>,
    poller: JobPoller<A>,
    aggregator: ReportAggregator<A>,
    state: LifecycleState,
    active: Option<ActiveJob>,
}

impl<A: AnalysisApi> JobLifecycleController<A> {
    pub fn new(api: Arc<A>, poll_interval: Duration) -> Self {
        Self {
            submitter: JobSubmitter::new(Arc::clone(&api)),
            poller: JobPoller::new(Arc::clone(&api), poll_interval),
            aggregator: ReportAggregator::new(api),
            state: LifecycleState::Idle,
            active: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Submits `input` and, on success, starts polling the created job.
    ///
    /// A failed creation request is not an error here: it moves the state
    /// to [`LifecycleState::Failed`].
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] if the input is unusable; the state
    ///   stays `Idle` and no request is made.
    /// - [`LifecycleError::Busy`] unless the state is `Idle`.
    pub async fn submit(&mut self, input: VideoInput) -> Result<&LifecycleState, LifecycleError> {
        if !matches!(self.state, LifecycleState::Idle) {
            return Err(LifecycleError::Busy {
                state: self.state.name(),
            });
        }
        input.validate()?;

        self.state = LifecycleState::Submitting;
        match self.submitter.submit(&input).await {
            Ok(job_id) => self.start_polling(job_id),
            Err(SubmitError::Validation(err)) => {
                self.state = LifecycleState::Idle;
                return Err(err.into());
            }
            Err(SubmitError::Submission(err)) => {
                self.state = LifecycleState::Failed {
                    job_id: None,
                    reason: FailureReason::Submission(err.source.to_string()),
                };
            }
        }
        Ok(&self.state)
    }

    /// Waits for the next event about the active job and applies it.
    ///
    /// Returns `None` when no job is being tracked, which includes every
    /// settled state.
    pub async fn next_update(&mut self) -> Option<Transition> {
        let active = self.active.as_mut()?;
        let event = active.events.recv().await?;

        let transition = self.state.apply(event);
        match &transition {
            Transition::FetchingReport => self.start_report_fetch(),
            Transition::Reported | Transition::Failed => {
                tracing::info!(
                    job_id = ?self.state.job_id(),
                    state = self.state.name(),
                    "job settled"
                );
                self.active = None;
            }
            Transition::Ignored => {
                tracing::debug!(state = self.state.name(), "ignored stale lifecycle event");
            }
            Transition::InProgress(_) | Transition::Warning(_) => {}
        }
        Some(transition)
    }

    /// Applies updates until the job settles, handing each one to `observe`.
    pub async fn run_until_settled<F>(&mut self, mut observe: F) -> &LifecycleState
    where
        F: FnMut(&Transition, &LifecycleState),
    {
        while let Some(transition) = self.next_update().await {
            observe(&transition, &self.state);
        }
        &self.state
    }

    /// Abandons the current job, if any, and returns to `Idle`.
    ///
    /// Outstanding requests are cancelled and any response still on its way
    /// is dropped unread.
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!(job_id = %active.job_id, "abandoning job");
        }
        self.state = LifecycleState::Idle;
    }

    fn start_polling(&mut self, job_id: JobId) {
        let cancel = CancellationToken::new();
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let poll_task = self
            .poller
            .spawn(job_id.clone(), cancel.clone(), events_tx.clone());

        self.active = Some(ActiveJob {
            job_id: job_id.clone(),
            cancel,
            events_tx,
            events,
            tasks: vec![poll_task],
        });
        self.state = LifecycleState::Polling {
            job: Job::new(job_id),
        };
    }

    fn start_report_fetch(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let aggregator = self.aggregator.clone();
        let cancel = active.cancel.clone();
        let tx = active.events_tx.clone();
        let job_id = active.job_id.clone();

        tracing::info!(job_id = %job_id, "job completed; fetching report");
        active.tasks.push(tokio::spawn(async move {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = aggregator.fetch(&job_id) => match result {
                    Ok(report) => LifecycleEvent::ReportReady { job_id: job_id.clone(), report },
                    Err(err) => {
                        tracing::warn!(job_id = %job_id, error = %err, "report fetch failed");
                        LifecycleEvent::ReportFailed(err)
                    }
                },
            };
            if !cancel.is_cancelled() {
                // A closed channel means the job was abandoned meanwhile.
                let _ = tx.send(event).await;
            }
        }));
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
