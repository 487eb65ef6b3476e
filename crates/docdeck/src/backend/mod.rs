//! Client-side view of the document-indexing backend.
//!
//! The backend itself is opaque: upload a PDF, get a job id, poll the
//! job. This module holds the wire types, the reqwest client, and the
//! polling machinery.

pub mod client;
pub mod error;
pub mod poll;
pub mod types;

pub use client::{BackendClient, IndexBackend};
pub use error::BackendError;
pub use poll::{poll_until, JobPoller};
pub use types::{
    HealthStatus, JobHandle, JobSnapshot, JobState, UploadFile, UploadOutcome,
};
