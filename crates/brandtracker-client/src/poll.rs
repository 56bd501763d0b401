//! Fixed-cadence status polling for one job.
//!
//! The poller awaits each status query before taking the next tick, so at
//! most one query is ever outstanding. Ticks that elapse while a slow query
//! is running are skipped rather than queued. Every observation is sent to
//! the caller as a [`PollUpdate`] message; the loop ends on the first
//! terminal status, on cancellation, or when the receiver goes away.

use std::sync::Arc;
use std::time::Duration;

use brandtracker_core::{JobId, JobStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::AnalysisApi;
use crate::error::ClientError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The first tick of the schedule `start + k * period` (`k >= 1`) that falls
/// strictly after `now`.
fn next_tick_after(start: Instant, now: Instant, period: Duration) -> Instant {
    let elapsed = now.saturating_duration_since(start);
    let periods = elapsed.as_nanos() / period.as_nanos().max(1);
    let k = u32::try_from(periods + 1).unwrap_or(u32::MAX);
    start + period.saturating_mul(k)
}

/// A single status query failed. Polling continues on the next tick.
#[derive(Debug, Error)]
#[error("status query for job {job_id} failed: {source}")]
pub struct PollTransientError {
    pub job_id: JobId,
    #[source]
    pub source: ClientError,
}

#[derive(Debug)]
pub enum PollUpdate {
    Status { job_id: JobId, status: JobStatus },
    Warning(PollTransientError),
}

/// Highest status observed so far for one job.
///
/// Accepts a status only if it does not move backwards along
/// `pending → processing → terminal`, and accepts nothing once terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusTracker {
    last: Option<JobStatus>,
}

impl StatusTracker {
    pub fn accept(&mut self, next: JobStatus) -> bool {
        match self.last {
            Some(current) if !current.can_advance_to(next) => false,
            _ => {
                self.last = Some(next);
                true
            }
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<JobStatus> {
        self.last
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.last.is_some_and(JobStatus::is_terminal)
    }
}

pub struct JobPoller<A> {
    api: Arc<A>,
    interval: Duration,
}

impl<A> Clone for JobPoller<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            interval: self.interval,
        }
    }
}

impl<A: AnalysisApi> JobPoller<A> {
    pub fn new(api: Arc<A>, interval: Duration) -> Self {
        Self { api, interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs [`Self::run`] on a new task.
    pub fn spawn<T>(
        &self,
        job_id: JobId,
        cancel: CancellationToken,
        tx: mpsc::Sender<T>,
    ) -> JoinHandle<()>
    where
        T: From<PollUpdate> + Send + 'static,
    {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(job_id, cancel, tx).await })
    }

    /// Polls `job_id` until a terminal status is delivered or `cancel` fires.
    ///
    /// The first query is issued immediately. Nothing is sent after
    /// cancellation, including the answer to a query that was in flight.
    pub async fn run<T>(&self, job_id: JobId, cancel: CancellationToken, tx: mpsc::Sender<T>)
    where
        T: From<PollUpdate> + Send + 'static,
    {
        let start = Instant::now();
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tracker = StatusTracker::default();

        tracing::info!(
            job_id = %job_id,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "status polling started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.api.job_status(&job_id) => result,
            };
            // An overdue tick would fire at once; ticks that elapsed during
            // the query are skipped and the next query waits for the schedule.
            ticker.reset_at(next_tick_after(start, Instant::now(), self.interval));

            let update = match result {
                Ok(status) if tracker.accept(status) => PollUpdate::Status {
                    job_id: job_id.clone(),
                    status,
                },
                Ok(status) => {
                    tracing::debug!(
                        job_id = %job_id,
                        %status,
                        last = ?tracker.last(),
                        "discarding out-of-order status"
                    );
                    continue;
                }
                Err(source) => {
                    tracing::warn!(
                        job_id = %job_id,
                        error = %source,
                        "status query failed; will retry on next tick"
                    );
                    PollUpdate::Warning(PollTransientError {
                        job_id: job_id.clone(),
                        source,
                    })
                }
            };

            if cancel.is_cancelled() || tx.send(update.into()).await.is_err() {
                tracing::debug!(job_id = %job_id, "status receiver gone; dropping update");
                break;
            }

            if tracker.is_terminal() {
                tracing::info!(
                    job_id = %job_id,
                    status = ?tracker.last(),
                    "job reached terminal status"
                );
                return;
            }
        }

        tracing::info!(job_id = %job_id, "status polling cancelled");
    }
}

#[cfg(test)]
#[path = "poll_test.rs"]
mod tests;
