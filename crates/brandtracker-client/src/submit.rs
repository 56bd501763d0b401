//! Turning a user-supplied video into a created job.

use std::fmt;
use std::sync::Arc;

use brandtracker_core::JobId;
use thiserror::Error;

use crate::api::AnalysisApi;
use crate::error::ClientError;

/// A video read from disk, uploaded as one multipart field.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Exactly one way of handing a video to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInput {
    File(VideoFile),
    Url(String),
}

/// Rejected input, detected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no video supplied: provide a file or a URL")]
    NoInput,

    #[error("video URL is empty")]
    EmptyUrl,

    #[error("both a file and a URL were supplied; provide only one")]
    Ambiguous,
}

/// The creation request failed at the network or service level.
#[derive(Debug, Error)]
#[error("job submission failed: {source}")]
pub struct SubmissionError {
    #[source]
    pub source: ClientError,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl VideoInput {
    /// Builds an input from the two optional fields of an upload form.
    ///
    /// A blank URL counts as absent when a file is present.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NoInput`] when neither is supplied.
    /// - [`ValidationError::EmptyUrl`] when only a blank URL is supplied.
    /// - [`ValidationError::Ambiguous`] when both a file and a non-blank URL
    ///   are supplied.
    pub fn from_parts(
        file: Option<VideoFile>,
        url: Option<String>,
    ) -> Result<Self, ValidationError> {
        let url_supplied = url.is_some();
        let url = url.filter(|u| !u.trim().is_empty());
        match (file, url) {
            (Some(_), Some(_)) => Err(ValidationError::Ambiguous),
            (Some(file), None) => Ok(Self::File(file)),
            (None, Some(url)) => Ok(Self::Url(url.trim().to_owned())),
            (None, None) if url_supplied => Err(ValidationError::EmptyUrl),
            (None, None) => Err(ValidationError::NoInput),
        }
    }

    /// Re-checks an input that may have been constructed directly.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUrl`] for a blank URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Url(url) if url.trim().is_empty() => Err(ValidationError::EmptyUrl),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Url(_) => "url",
        }
    }
}

/// Issues exactly one creation request per call. No retries.
pub struct JobSubmitter<A> {
    api: Arc<A>,
}

impl<A> Clone for JobSubmitter<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: AnalysisApi> JobSubmitter<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Creates a job for `input` and returns its id.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Validation`] for a blank URL; no request is made.
    /// - [`SubmitError::Submission`] if the creation request fails.
    pub async fn submit(&self, input: &VideoInput) -> Result<JobId, SubmitError> {
        input.validate()?;

        match self.api.create_job(input).await {
            Ok(job_id) => {
                tracing::info!(job_id = %job_id, input = input.kind(), "job created");
                Ok(job_id)
            }
            Err(source) => {
                tracing::warn!(input = input.kind(), error = %source, "job creation failed");
                Err(SubmissionError { source }.into())
            }
        }
    }
}
