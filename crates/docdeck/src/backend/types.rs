//! Wire types for the document-indexing backend.
//!
//! These mirror the backend's JSON shapes; the backend speaks camelCase.
//! Snapshots are read-only; the client never writes job state back.

use serde::{Deserialize, Serialize};

/// Opaque handle for one submitted indexing job.
///
/// Valid for the lifetime of a single polling loop; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-reported state of an indexing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Extracting,
    Embedding,
    Saving,
    Done,
    Error,
    NotFound,
    /// A state this client does not know. Treated as non-terminal so a
    /// newer backend can add intermediate stages without breaking polls.
    #[serde(other)]
    Other,
}

impl JobState {
    /// Terminal states end the polling loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error | JobState::NotFound)
    }

    /// Representative percentage for a coarse stage, used when the backend
    /// does not report an explicit progress number.
    pub fn stage_percent(&self) -> Option<u8> {
        match self {
            JobState::Extracting => Some(10),
            JobState::Embedding => Some(30),
            JobState::Saving => Some(95),
            JobState::Done => Some(100),
            JobState::Error | JobState::NotFound | JobState::Other => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Extracting => write!(f, "Extracting text"),
            JobState::Embedding => write!(f, "Generating embeddings"),
            JobState::Saving => write!(f, "Saving to index"),
            JobState::Done => write!(f, "Done"),
            JobState::Error => write!(f, "Error"),
            JobState::NotFound => write!(f, "Unknown job"),
            JobState::Other => write!(f, "Processing"),
        }
    }
}

/// Point-in-time read of a job's status from `GET /upload/status/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub chunks: Option<u32>,
}

impl JobSnapshot {
    /// Builds the synthetic snapshot returned when polling exceeds its
    /// attempt ceiling without a terminal state from the backend.
    pub fn timed_out(elapsed_secs: u64) -> Self {
        Self {
            state: JobState::Error,
            message: Some(format!(
                "Indexing did not finish within {}s; the server may be overloaded",
                elapsed_secs
            )),
            progress: None,
            pages: None,
            chunks: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Normalized progress percentage. Explicit backend progress wins and
    /// is clamped to [0, 100] and rounded; otherwise the coarse stage maps
    /// to a representative value.
    pub fn percent(&self) -> Option<u8> {
        match self.progress {
            Some(p) => Some(p.clamp(0.0, 100.0).round() as u8),
            None => self.state.stage_percent(),
        }
    }
}

/// Outcome of submitting one file to `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The backend accepted the file and started an indexing job.
    Submitted(JobHandle),
    /// The backend already has this document indexed; no job was started.
    Skipped,
}

/// Raw body of a 2xx `POST /upload` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub skipped: Option<bool>,
}

/// One file selected for upload: display name plus raw PDF bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DuplicateCheckRequest<'a> {
    pub file_names: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DuplicateCheckResponse {
    #[serde(default)]
    pub duplicates: Vec<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
