//! HTTP client for the document-indexing backend.
//!
//! The backend is opaque: it accepts a PDF upload, returns a job id, and
//! exposes a status endpoint for that id. Extraction and embedding happen
//! entirely server-side.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{abortable, AbortHandle, Aborted};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Config;

use super::error::BackendError;
use super::types::{
    DuplicateCheckRequest, DuplicateCheckResponse, HealthStatus, JobHandle, JobSnapshot,
    UploadFile, UploadOutcome, UploadResponse,
};

/// Operations the ingestion core needs from the indexing backend.
///
/// The production implementation is [`BackendClient`]; tests drive the
/// orchestrator against a scripted stub instead of a network.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Asks the backend which of the given file names are already indexed.
    async fn check_duplicates(&self, file_names: &[String]) -> Result<Vec<String>, BackendError>;

    /// Uploads one file, returning a job handle or a server-side skip.
    async fn submit(
        &self,
        file: &UploadFile,
        scope_label: Option<&str>,
    ) -> Result<UploadOutcome, BackendError>;

    /// Fetches a point-in-time snapshot of one job's status.
    async fn job_status(&self, handle: &JobHandle) -> Result<JobSnapshot, BackendError>;
}

/// reqwest-backed client for the indexing backend.
pub struct BackendClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
    submit_timeout: Duration,
}

impl BackendClient {
    /// Builds a client from config. The default request timeout applies to
    /// short calls; uploads get their own, much longer, per-request cap.
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| BackendError::Connect { source })?;

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            submit_timeout: config.submit_timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn rejection(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            "no error details provided".to_string()
        } else {
            body
        };
        BackendError::Rejected { status, message }
    }

    async fn health_inner(&self) -> Result<HealthStatus, BackendError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.request_timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|source| BackendError::Decode { source })
    }

    /// Checks backend health once.
    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.health_inner().await
    }

    /// Checks backend health with an abort handle, so a new check can
    /// cancel one that is still in flight. This is the only abortable
    /// request the console makes.
    pub fn health_abortable(
        &self,
    ) -> (
        AbortHandle,
        impl Future<Output = Result<HealthStatus, BackendError>> + '_,
    ) {
        let (fut, handle) = abortable(self.health_inner());
        let wrapped = async move {
            match fut.await {
                Ok(result) => result,
                Err(Aborted) => Err(BackendError::Aborted),
            }
        };
        (handle, wrapped)
    }
}

#[async_trait]
impl IndexBackend for BackendClient {
    async fn check_duplicates(&self, file_names: &[String]) -> Result<Vec<String>, BackendError> {
        let response = self
            .http
            .post(self.url("/check-duplicates"))
            .json(&DuplicateCheckRequest { file_names })
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.request_timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: DuplicateCheckResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Decode { source })?;

        debug!(
            candidates = file_names.len(),
            duplicates = body.duplicates.len(),
            "duplicate check complete"
        );

        Ok(body.duplicates)
    }

    async fn submit(
        &self,
        file: &UploadFile,
        scope_label: Option<&str>,
    ) -> Result<UploadOutcome, BackendError> {
        let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(mime.essence_str())
            .map_err(|_| {
                BackendError::Malformed(format!("invalid content type for '{}'", file.name))
            })?;

        let mut form = Form::new().part("pdf", part);
        if let Some(label) = scope_label {
            form = form.text("brandName", label.to_string());
        }

        info!(file = %file.name, bytes = file.bytes.len(), "submitting upload");

        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.submit_timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Decode { source })?;

        if body.skipped == Some(true) {
            return Ok(UploadOutcome::Skipped);
        }

        match body.task_id {
            Some(id) => Ok(UploadOutcome::Submitted(JobHandle(id))),
            None => Err(BackendError::Malformed(
                "upload response carried neither a task id nor a skip flag".to_string(),
            )),
        }
    }

    async fn job_status(&self, handle: &JobHandle) -> Result<JobSnapshot, BackendError> {
        let response = self
            .http
            .get(self.url(&format!("/upload/status/{}", handle)))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.request_timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json::<JobSnapshot>()
            .await
            .map_err(|source| BackendError::Decode { source })
    }
}
