//! Command handlers for `analyze`, `status` and `report`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use brandtracker_client::{
    AnalysisClient, JobLifecycleController, LifecycleState, ReportAggregator, Transition,
    VideoFile, VideoInput,
};
use brandtracker_core::{AppConfig, JobId};

use crate::render;

fn build_client(config: &AppConfig) -> anyhow::Result<AnalysisClient> {
    AnalysisClient::with_base_url(
        &config.api_base_url,
        config.request_timeout_secs,
        &config.user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build analysis client: {e}"))
}

async fn read_video(path: &Path) -> anyhow::Result<VideoFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read video file {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "video".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(VideoFile { file_name, bytes })
}

fn print_progress(transition: &Transition, state: &LifecycleState) {
    match transition {
        Transition::InProgress(status) => println!("  status: {status}"),
        Transition::Warning(err) => eprintln!("warning: {err}; retrying"),
        Transition::FetchingReport => println!("Analysis complete; fetching report..."),
        Transition::Reported | Transition::Failed => {
            tracing::debug!(state = state.name(), "lifecycle settled");
        }
        Transition::Ignored => {}
    }
}

/// Submit a video and wait until its job settles.
///
/// The deadline, when set, is enforced from outside the lifecycle: on expiry
/// the controller is reset, which cancels polling and any in-flight request.
///
/// # Errors
///
/// Returns an error if the input is invalid, the file cannot be read, the
/// job fails, or the deadline elapses first.
pub(crate) async fn run_analyze(
    config: &AppConfig,
    url: Option<String>,
    file: Option<&Path>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let file = match file {
        Some(path) => Some(read_video(path).await?),
        None => None,
    };
    let input = VideoInput::from_parts(file, url)?;

    let client = build_client(config)?;
    let mut controller = JobLifecycleController::new(
        Arc::new(client),
        Duration::from_secs(config.poll_interval_secs),
    );

    match controller.submit(input).await? {
        LifecycleState::Polling { job } => {
            println!("Analyzing match footage... (job {})", job.id());
        }
        LifecycleState::Failed { reason, .. } => {
            anyhow::bail!("{}", render::failure_line(reason));
        }
        other => anyhow::bail!("unexpected state after submission: {}", other.name()),
    }

    let deadline = timeout_secs.or(config.max_wait_secs);
    if let Some(secs) = deadline {
        let settled = tokio::time::timeout(
            Duration::from_secs(secs),
            controller.run_until_settled(print_progress),
        )
        .await;
        if settled.is_err() {
            let job_id = controller
                .state()
                .job_id()
                .map(ToString::to_string)
                .unwrap_or_default();
            controller.reset();
            anyhow::bail!("job {job_id} did not finish within {secs}s; abandoned");
        }
    } else {
        controller.run_until_settled(print_progress).await;
    }

    match controller.state() {
        LifecycleState::Reporting { job, view } => {
            let report = job.report().cloned().unwrap_or_default();
            print!("{}", render::report(&report, view));
            Ok(())
        }
        LifecycleState::Failed { reason, .. } => {
            anyhow::bail!("{}", render::failure_line(reason))
        }
        other => anyhow::bail!("job stopped in unexpected state: {}", other.name()),
    }
}

/// Print a single status query for `id`.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the query fails.
pub(crate) async fn run_status(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let info = client.job_status_info(&JobId::from(id)).await?;

    println!("job {id}: {}", info.status);
    if let Some(filename) = &info.filename {
        println!("file: {filename}");
    }
    if let Some(duration) = info.duration_seconds {
        println!("video length: {duration:.1}s");
    }
    Ok(())
}

/// Fetch and render the report of a completed job.
///
/// # Errors
///
/// Returns an error if the report is unavailable or invalid.
pub(crate) async fn run_report(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let aggregator = ReportAggregator::new(Arc::new(build_client(config)?));
    let aggregated = aggregator.fetch(&JobId::from(id)).await?;

    print!("{}", render::report(&aggregated.report, &aggregated.view));
    Ok(())
}
