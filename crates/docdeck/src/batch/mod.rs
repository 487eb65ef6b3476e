//! Batch ingestion core: per-file progress tracking, duplicate gating,
//! and the sequential orchestration loop.

pub mod duplicates;
pub mod orchestrator;
pub mod session;
pub mod task;

pub use duplicates::{derived_title, DuplicateDetector};
pub use orchestrator::{BatchReport, IngestOrchestrator, Scope};
pub use session::BatchSession;
pub use task::{FileTask, TaskProgressEvent, TaskStatus};
