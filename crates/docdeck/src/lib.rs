pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod meta;

pub use backend::{BackendClient, BackendError, IndexBackend, JobPoller, JobSnapshot, JobState};
pub use batch::{
    BatchReport, BatchSession, DuplicateDetector, FileTask, IngestOrchestrator, Scope, TaskStatus,
};
pub use config::{load_config, Config};
pub use error::{ConfigError, DocdeckError, Result};
pub use meta::{Database, DatabaseError};
