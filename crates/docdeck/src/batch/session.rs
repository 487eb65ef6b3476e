//! Batch session: the progress model the operator's view renders.
//!
//! One `BatchSession` exists per ingestion run, owned by the orchestrator.
//! It replaces ambient global batch state with an explicit value: only the
//! orchestrator's single control flow mutates it, so no locking is needed.
//! Applied patches are also published on a broadcast channel so a UI can
//! stream updates without holding a reference to the session.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::task::{FileTask, TaskProgressEvent, TaskStatus};

/// Default age after which a non-terminal task is flagged as stalled.
const DEFAULT_STALL_THRESHOLD: Duration = Duration::from_secs(25);

/// Default display window for finished batches before eviction.
const DEFAULT_EVICTION_DELAY: Duration = Duration::from_secs(5);

/// Broadcast channel capacity for progress events.
const EVENT_CAPACITY: usize = 100;

pub struct BatchSession {
    id: String,
    tasks: Vec<FileTask>,
    sender: broadcast::Sender<TaskProgressEvent>,
    stall_threshold: Duration,
    eviction_delay: Duration,
    evict_after: Option<DateTime<Utc>>,
}

impl BatchSession {
    /// Creates a session with one `Waiting` task per file name.
    pub fn new(file_names: &[String]) -> Self {
        Self::with_settings(file_names, DEFAULT_STALL_THRESHOLD, DEFAULT_EVICTION_DELAY)
    }

    pub fn with_settings(
        file_names: &[String],
        stall_threshold: Duration,
        eviction_delay: Duration,
    ) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tasks: file_names.iter().map(|n| FileTask::new(n.as_str())).collect(),
            sender,
            stall_threshold,
            eviction_delay,
            evict_after: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskProgressEvent> {
        self.sender.subscribe()
    }

    /// Applies a `{status, message, progress}` patch to one task and
    /// broadcasts the result. Returns false if the task does not exist or
    /// is already terminal.
    pub fn apply(
        &mut self,
        file_name: &str,
        status: TaskStatus,
        message: impl Into<String>,
        progress: Option<u8>,
    ) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.file_name == file_name) else {
            log::warn!("patch for unknown file '{}' dropped", file_name);
            return false;
        };

        if !task.apply(status, message, progress) {
            return false;
        }

        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(TaskProgressEvent {
            batch_id: self.id.clone(),
            file_name: task.file_name.clone(),
            status: task.status,
            message: task.message.clone(),
            progress: task.progress,
            timestamp: task.last_updated_at,
        });

        true
    }

    pub fn task(&self, file_name: &str) -> Option<&FileTask> {
        self.tasks.iter().find(|t| t.file_name == file_name)
    }

    /// Tasks in input order.
    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    /// Tasks ordered for display: active entries first, then waiting,
    /// then errors, then done. Stable within each rank.
    pub fn display_order(&self) -> Vec<&FileTask> {
        let mut ordered: Vec<&FileTask> = self.tasks.iter().collect();
        ordered.sort_by_key(|t| t.status.display_rank());
        ordered
    }

    /// Display message for a task, with a stall advisory appended when a
    /// non-terminal entry has not been updated within the threshold. The
    /// advisory never changes the task's status.
    pub fn display_message(&self, task: &FileTask, now: DateTime<Utc>) -> String {
        let age = task.seconds_since_update(now);
        if !task.status.is_terminal() && age > self.stall_threshold.as_secs() as i64 {
            format!("{} (no update received for {}s)", task.message, age)
        } else {
            task.message.clone()
        }
    }

    /// Counts by bucket: (waiting, active, done, error).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut waiting = 0;
        let mut active = 0;
        let mut done = 0;
        let mut error = 0;

        for task in &self.tasks {
            match task.status {
                TaskStatus::Waiting => waiting += 1,
                TaskStatus::Done => done += 1,
                TaskStatus::Error => error += 1,
                _ => active += 1,
            }
        }

        (waiting, active, done, error)
    }

    /// Schedules eviction of the visible task list after the display
    /// window. Called by the orchestrator once a batch finishes.
    pub fn schedule_eviction(&mut self, now: DateTime<Utc>) {
        let delay = chrono::Duration::from_std(self.eviction_delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));
        self.evict_after = Some(now + delay);
    }

    /// Evicts the task list if its display window has elapsed. Returns
    /// true when eviction happened.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> bool {
        match self.evict_after {
            Some(deadline) if now >= deadline => {
                self.tasks.clear();
                self.evict_after = None;
                true
            }
            _ => false,
        }
    }

    /// Immediately clears the task list (new batch started or panel closed).
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.evict_after = None;
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
