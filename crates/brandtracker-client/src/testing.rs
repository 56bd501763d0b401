//! Scripted in-memory [`AnalysisApi`] for lifecycle tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use brandtracker_core::{JobId, JobStatus, SponsorRecord};
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

use crate::api::AnalysisApi;
use crate::error::ClientError;
use crate::submit::VideoInput;

/// One scripted answer to a status query.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StatusStep {
    Reply(JobStatus),
    Fail,
}

pub(crate) fn service_unavailable() -> ClientError {
    ClientError::UnexpectedStatus {
        status: 503,
        url: "http://analysis.test/videos".to_owned(),
    }
}

pub(crate) fn record(sponsor: &str, duration: f64, detections: u64, first: f64) -> SponsorRecord {
    SponsorRecord {
        sponsor: sponsor.to_owned(),
        duration_seconds: duration,
        detections,
        first_appearance: first,
    }
}

pub(crate) fn match_rows() -> Vec<SponsorRecord> {
    vec![
        record("Nike", 42.5, 10, 3.2),
        record("Pepsi", 20.0, 4, 8.0),
    ]
}

pub(crate) struct ScriptedApi {
    job_ids: Mutex<VecDeque<JobId>>,
    fail_creation: bool,
    statuses: Mutex<VecDeque<StatusStep>>,
    status_delay: Option<Duration>,
    hold_status: AtomicBool,
    status_gate: Semaphore,
    status_started: Notify,
    report: Mutex<Option<Vec<SponsorRecord>>>,
    hold_report: AtomicBool,
    report_gate: Semaphore,
    report_started: Notify,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    report_calls: AtomicUsize,
    status_in_flight: AtomicUsize,
    max_status_in_flight: AtomicUsize,
    status_started_at: Mutex<Vec<Instant>>,
}

/// Decrements the in-flight counter even when the query future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            job_ids: Mutex::new(VecDeque::new()),
            fail_creation: false,
            statuses: Mutex::new(VecDeque::new()),
            status_delay: None,
            hold_status: AtomicBool::new(false),
            status_gate: Semaphore::new(0),
            status_started: Notify::new(),
            report: Mutex::new(None),
            hold_report: AtomicBool::new(false),
            report_gate: Semaphore::new(0),
            report_started: Notify::new(),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            status_in_flight: AtomicUsize::new(0),
            max_status_in_flight: AtomicUsize::new(0),
            status_started_at: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_job_ids<const N: usize>(self, ids: [&str; N]) -> Self {
        self.job_ids
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(JobId::from));
        self
    }

    pub(crate) fn failing_creation(mut self) -> Self {
        self.fail_creation = true;
        self
    }

    pub(crate) fn with_statuses<I>(self, steps: I) -> Self
    where
        I: IntoIterator<Item = StatusStep>,
    {
        self.statuses.lock().unwrap().extend(steps);
        self
    }

    pub(crate) fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) fn with_report(self, rows: Vec<SponsorRecord>) -> Self {
        *self.report.lock().unwrap() = Some(rows);
        self
    }

    /// Status queries block until [`Self::release_status`] is called.
    pub(crate) fn holding_status(self) -> Self {
        self.hold_status.store(true, Ordering::SeqCst);
        self
    }

    /// Report fetches block until [`Self::release_report`] is called.
    pub(crate) fn holding_report(self) -> Self {
        self.hold_report.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn release_status(&self) {
        self.status_gate.add_permits(1);
    }

    pub(crate) fn release_report(&self) {
        self.report_gate.add_permits(1);
    }

    pub(crate) async fn status_call_started(&self) {
        self.status_started.notified().await;
    }

    pub(crate) async fn report_call_started(&self) {
        self.report_started.notified().await;
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_status_in_flight(&self) -> usize {
        self.max_status_in_flight.load(Ordering::SeqCst)
    }

    /// Gaps between the starts of consecutive status queries.
    pub(crate) fn status_gaps(&self) -> Vec<Duration> {
        let starts = self.status_started_at.lock().unwrap();
        starts.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl AnalysisApi for ScriptedApi {
    async fn create_job(&self, _input: &VideoInput) -> Result<JobId, ClientError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_creation {
            return Err(service_unavailable());
        }
        let next = self.job_ids.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| JobId::new(format!("job-{n}"))))
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_started_at.lock().unwrap().push(Instant::now());
        let now = self.status_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_status_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.status_in_flight);
        self.status_started.notify_one();

        if self.hold_status.load(Ordering::SeqCst) {
            self.status_gate
                .acquire()
                .await
                .expect("gate is never closed")
                .forget();
        }
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.statuses.lock().unwrap().pop_front();
        match step.unwrap_or(StatusStep::Reply(JobStatus::Processing)) {
            StatusStep::Reply(status) => Ok(status),
            StatusStep::Fail => Err(service_unavailable()),
        }
    }

    async fn fetch_report(&self, _job_id: &JobId) -> Result<Vec<SponsorRecord>, ClientError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.report_started.notify_one();

        if self.hold_report.load(Ordering::SeqCst) {
            self.report_gate
                .acquire()
                .await
                .expect("gate is never closed")
                .forget();
        }

        let rows = self.report.lock().unwrap().clone();
        rows.ok_or_else(service_unavailable)
    }
}
