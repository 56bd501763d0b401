//! HTTP client for the video analysis service.
//!
//! Wraps `reqwest` with typed request/response handling for the four
//! endpoints the lifecycle depends on. Every non-2xx response surfaces as
//! [`ClientError::UnexpectedStatus`]; no request is retried here.

use std::time::Duration;

use brandtracker_core::{JobId, JobStatus, SponsorRecord};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::api::AnalysisApi;
use crate::error::ClientError;
use crate::submit::{VideoFile, VideoInput};
use crate::types::{
    CreateFromUrlRequest, CreateJobResponse, JobStatusInfo, ReportResponse, StatusResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client for the analysis service REST API.
///
/// Use [`AnalysisClient::new`] for the default local service or
/// [`AnalysisClient::with_base_url`] to point at another deployment (or a
/// mock server in tests).
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: Url,
}

impl AnalysisClient {
    /// Creates a client pointed at [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, user_agent)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` does not parse as a hierarchical URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise to exactly one trailing slash so endpoint segments are
        // appended under any path prefix instead of replacing it.
        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "URL cannot carry a path".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Uploads a video as a single multipart field named `file`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ClientError::Deserialize`] if the body lacks a job id.
    pub async fn create_job_from_file(&self, file: &VideoFile) -> Result<JobId, ClientError> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = Form::new().part("file", part);

        let resp: CreateJobResponse = self
            .send_json(self.client.post(url.clone()).multipart(form), &url)
            .await?;
        tracing::debug!(
            filename = resp.filename.as_deref().unwrap_or(&file.file_name),
            "upload accepted"
        );
        Ok(resp.id.into())
    }

    /// Asks the service to fetch and analyse a remotely hosted video.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx response (the service
    ///   answers 400 when it cannot download the URL).
    /// - [`ClientError::Deserialize`] if the body lacks a job id.
    pub async fn create_job_from_url(&self, video_url: &str) -> Result<JobId, ClientError> {
        let url = self.endpoint(&["upload-url"])?;
        let body = CreateFromUrlRequest { url: video_url };

        let resp: CreateJobResponse = self
            .send_json(self.client.post(url.clone()).json(&body), &url)
            .await?;
        tracing::debug!(
            filename = resp.filename.as_deref().unwrap_or(video_url),
            "remote video accepted"
        );
        Ok(resp.id.into())
    }

    /// Queries the status of one job along with its filename and duration.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx response (404 for an
    ///   unknown job).
    /// - [`ClientError::Deserialize`] on a malformed body or unknown status.
    pub async fn job_status_info(&self, job_id: &JobId) -> Result<JobStatusInfo, ClientError> {
        let url = self.endpoint(&["videos", job_id.as_str()])?;
        let resp: StatusResponse = self.send_json(self.client.get(url.clone()), &url).await?;
        Ok(resp.into())
    }

    /// Fetches the sponsor rows of a completed job.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ClientError::Deserialize`] on a malformed body.
    /// - [`ClientError::ReportUnavailable`] if the body carries no `sponsors`.
    pub async fn report_rows(&self, job_id: &JobId) -> Result<Vec<SponsorRecord>, ClientError> {
        let url = self.endpoint(&["videos", job_id.as_str(), "report"])?;
        let resp: ReportResponse = self.send_json(self.client.get(url.clone()), &url).await?;

        resp.sponsors.ok_or_else(|| ClientError::ReportUnavailable {
            job_id: job_id.to_string(),
            detail: resp
                .message
                .or(resp.status.map(|s| format!("job status is {s}")))
                .unwrap_or_else(|| "response has no sponsors".to_owned()),
        })
    }

    /// Builds an endpoint URL by appending percent-encoded path segments to
    /// the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request, asserts a 2xx status, and parses the body as JSON.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

impl AnalysisApi for AnalysisClient {
    async fn create_job(&self, input: &VideoInput) -> Result<JobId, ClientError> {
        match input {
            VideoInput::File(file) => self.create_job_from_file(file).await,
            VideoInput::Url(url) => self.create_job_from_url(url.trim()).await,
        }
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ClientError> {
        Ok(self.job_status_info(job_id).await?.status)
    }

    async fn fetch_report(&self, job_id: &JobId) -> Result<Vec<SponsorRecord>, ClientError> {
        self.report_rows(job_id).await
    }
}
