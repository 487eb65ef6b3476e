//! Per-file task records and their status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of a file in the ingestion pipeline.
///
/// `Waiting -> Uploading -> Processing -> Saving -> {Done | Error}`.
/// `Done` and `Error` are terminal: a file that needs retrying is
/// resubmitted as a new task in a later batch, never mutated in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Waiting,
    Uploading,
    Processing,
    Saving,
    Done,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }

    /// True while the file has an in-flight backend operation.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TaskStatus::Uploading | TaskStatus::Processing | TaskStatus::Saving
        )
    }

    /// Sort rank for display: busiest entries first so the operator does
    /// not have to hunt for them, then waiting, then errors, then done.
    pub(crate) fn display_rank(&self) -> u8 {
        match self {
            TaskStatus::Uploading | TaskStatus::Processing | TaskStatus::Saving => 0,
            TaskStatus::Waiting => 1,
            TaskStatus::Error => 2,
            TaskStatus::Done => 3,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Waiting => write!(f, "Waiting"),
            TaskStatus::Uploading => write!(f, "Uploading"),
            TaskStatus::Processing => write!(f, "Processing"),
            TaskStatus::Saving => write!(f, "Saving"),
            TaskStatus::Done => write!(f, "Done"),
            TaskStatus::Error => write!(f, "Error"),
        }
    }
}

/// One entry per file selected for the current batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTask {
    /// Display name of the source file, unique within the batch.
    pub file_name: String,
    /// Current pipeline stage.
    pub status: TaskStatus,
    /// Human-readable current-activity string.
    pub message: String,
    /// Progress percentage, non-decreasing while non-terminal.
    pub progress: u8,
    /// Timestamp of the most recent status mutation, used to detect stalls.
    pub last_updated_at: DateTime<Utc>,
}

impl FileTask {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: TaskStatus::Waiting,
            message: "Waiting...".to_string(),
            progress: 0,
            last_updated_at: Utc::now(),
        }
    }

    /// Applies a status patch atomically and stamps `last_updated_at`.
    ///
    /// Returns false (and changes nothing) when the task is already
    /// terminal. While non-terminal, a progress value lower than the
    /// current one is ignored so the bar never moves backwards; `Done`
    /// pins progress at 100 and `Error` freezes the last value.
    pub fn apply(
        &mut self,
        status: TaskStatus,
        message: impl Into<String>,
        progress: Option<u8>,
    ) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = status;
        self.message = message.into();

        match status {
            TaskStatus::Done => self.progress = 100,
            TaskStatus::Error => {}
            _ => {
                if let Some(p) = progress {
                    let p = p.min(100);
                    if p > self.progress {
                        self.progress = p;
                    }
                }
            }
        }

        self.last_updated_at = Utc::now();
        true
    }

    /// Age of the last update, saturating at zero for clock skew.
    pub fn seconds_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated_at).num_seconds().max(0)
    }
}

/// Progress event published for every applied task patch, for UI streaming.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgressEvent {
    /// Identifier of the batch this task belongs to.
    pub batch_id: String,
    /// File the patch applies to.
    pub file_name: String,
    /// Status after the patch.
    pub status: TaskStatus,
    /// Message after the patch.
    pub message: String,
    /// Progress after the patch.
    pub progress: u8,
    /// Timestamp of the patch.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_waiting() {
        let task = FileTask::new("doc.pdf");
        assert_eq!(task.status, TaskStatus::Waiting);
        assert_eq!(task.progress, 0);
        assert_eq!(task.message, "Waiting...");
    }

    #[test]
    fn test_apply_moves_through_pipeline() {
        let mut task = FileTask::new("doc.pdf");

        assert!(task.apply(TaskStatus::Uploading, "Uploading document...", None));
        assert_eq!(task.status, TaskStatus::Uploading);

        assert!(task.apply(TaskStatus::Processing, "Extracting text", Some(10)));
        assert_eq!(task.progress, 10);

        assert!(task.apply(TaskStatus::Saving, "Saving to index", Some(95)));
        assert!(task.apply(TaskStatus::Done, "Indexing complete", None));
        assert_eq!(task.progress, 100, "Done pins progress at 100");
    }

    #[test]
    fn test_terminal_state_is_immutable() {
        let mut task = FileTask::new("doc.pdf");
        task.apply(TaskStatus::Error, "upload failed", None);

        assert!(!task.apply(TaskStatus::Processing, "should not happen", Some(50)));
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.message, "upload failed");
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut task = FileTask::new("doc.pdf");
        task.apply(TaskStatus::Processing, "working", Some(47));
        task.apply(TaskStatus::Processing, "still working", Some(30));
        assert_eq!(task.progress, 47, "lower progress values are ignored");

        task.apply(TaskStatus::Processing, "more", Some(60));
        assert_eq!(task.progress, 60);
    }

    #[test]
    fn test_error_freezes_progress() {
        let mut task = FileTask::new("doc.pdf");
        task.apply(TaskStatus::Processing, "working", Some(47));
        task.apply(TaskStatus::Error, "backend died", None);
        assert_eq!(task.progress, 47);
    }

    #[test]
    fn test_progress_capped_at_100() {
        let mut task = FileTask::new("doc.pdf");
        task.apply(TaskStatus::Processing, "working", Some(200));
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_apply_stamps_update_time() {
        let mut task = FileTask::new("doc.pdf");
        let before = task.last_updated_at;
        task.apply(TaskStatus::Uploading, "Uploading...", None);
        assert!(task.last_updated_at >= before);
    }

    #[test]
    fn test_display_rank_ordering() {
        assert!(TaskStatus::Uploading.display_rank() < TaskStatus::Waiting.display_rank());
        assert!(TaskStatus::Waiting.display_rank() < TaskStatus::Error.display_rank());
        assert!(TaskStatus::Error.display_rank() < TaskStatus::Done.display_rank());
        assert_eq!(
            TaskStatus::Processing.display_rank(),
            TaskStatus::Saving.display_rank()
        );
    }

    #[test]
    fn test_seconds_since_update() {
        let mut task = FileTask::new("doc.pdf");
        task.last_updated_at = Utc::now() - chrono::Duration::seconds(30);
        let age = task.seconds_since_update(Utc::now());
        assert!((29..=31).contains(&age));
    }
}
