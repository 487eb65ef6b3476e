//! Batch ingestion orchestrator.
//!
//! Drives one batch file-by-file, strictly sequentially, so a single
//! operator action cannot flood the backend: duplicate gate, then for
//! each remaining file submit -> poll -> register, with every failure
//! contained to its own file. No step is retried within a run; the
//! operator re-triggers a new batch (optionally forcing re-upload) to
//! retry a failed file.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::backend::client::IndexBackend;
use crate::backend::poll::JobPoller;
use crate::backend::types::{JobSnapshot, JobState, UploadFile, UploadOutcome};
use crate::config::Config;
use crate::meta::document_repo::{self, NewDocument};
use crate::meta::Database;

use super::duplicates::{derived_title, DuplicateDetector};
use super::session::BatchSession;
use super::task::TaskStatus;

/// The taxonomy node (brand or model) a batch of files is attached to.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Stable identifier, keys metadata records.
    pub id: String,
    /// Display name, forwarded to the backend with each upload.
    pub label: Option<String>,
}

impl Scope {
    pub fn new(id: impl Into<String>, label: Option<String>) -> Self {
        Self {
            id: id.into(),
            label,
        }
    }
}

/// Outcome counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct IngestOrchestrator<B: IndexBackend> {
    backend: B,
    db: Database,
    poll_interval: Duration,
    poll_max_attempts: u32,
    on_complete: Option<Box<dyn Fn() + Send + Sync>>,
}

impl<B: IndexBackend> IngestOrchestrator<B> {
    pub fn new(backend: B, db: Database, config: &Config) -> Self {
        Self {
            backend,
            db,
            poll_interval: config.poll_interval(),
            poll_max_attempts: config.poll_max_attempts,
            on_complete: None,
        }
    }

    /// Registers a hook invoked once after every batch, whatever the
    /// outcome. The console uses it to refresh the taxonomy view.
    pub fn with_refresh_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one batch to completion.
    ///
    /// With `force_all` unset, files flagged by the duplicate check are
    /// marked done without any network traffic. `force_all` skips the
    /// check entirely and pushes every file through the full pipeline.
    pub async fn run_batch(
        &self,
        session: &mut BatchSession,
        files: &[UploadFile],
        scope: &Scope,
        force_all: bool,
    ) -> BatchReport {
        let mut report = BatchReport {
            total: files.len(),
            ..Default::default()
        };

        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let duplicates: HashSet<String> = if force_all {
            HashSet::new()
        } else {
            DuplicateDetector::new(&self.backend, &self.db)
                .detect(&scope.id, &names)
                .await
        };

        info!(
            batch = %session.id(),
            scope = %scope.id,
            files = files.len(),
            duplicates = duplicates.len(),
            "starting ingestion batch"
        );

        for file in files {
            if !force_all && duplicates.contains(&file.name) {
                session.apply(
                    &file.name,
                    TaskStatus::Done,
                    "Skipped: already indexed",
                    None,
                );
                report.skipped += 1;
                continue;
            }

            self.ingest_file(session, file, scope, &mut report).await;
        }

        session.schedule_eviction(Utc::now());
        if let Some(hook) = &self.on_complete {
            hook();
        }

        info!(
            batch = %session.id(),
            indexed = report.indexed,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );

        report
    }

    /// Drives one file through submit -> poll -> register. Any failure
    /// marks this file's task `Error` and returns; the batch continues.
    async fn ingest_file(
        &self,
        session: &mut BatchSession,
        file: &UploadFile,
        scope: &Scope,
        report: &mut BatchReport,
    ) {
        session.apply(
            &file.name,
            TaskStatus::Uploading,
            "Uploading document...",
            None,
        );

        let handle = match self.backend.submit(file, scope.label.as_deref()).await {
            Ok(UploadOutcome::Submitted(handle)) => handle,
            Ok(UploadOutcome::Skipped) => {
                session.apply(
                    &file.name,
                    TaskStatus::Done,
                    "Skipped: already indexed on the server",
                    None,
                );
                report.skipped += 1;
                return;
            }
            Err(e) => {
                warn!(file = %file.name, "upload failed: {}", e);
                session.apply(&file.name, TaskStatus::Error, e.to_string(), None);
                report.failed += 1;
                return;
            }
        };

        session.apply(
            &file.name,
            TaskStatus::Processing,
            "Upload accepted; indexing started...",
            None,
        );

        let poller = JobPoller::new(&self.backend, self.poll_interval, self.poll_max_attempts);
        let terminal = poller
            .poll(&handle, |snapshot| {
                let status = match snapshot.state {
                    JobState::Saving => TaskStatus::Saving,
                    _ => TaskStatus::Processing,
                };
                let message = snapshot
                    .message
                    .clone()
                    .unwrap_or_else(|| snapshot.state.to_string());
                session.apply(&file.name, status, message, snapshot.percent());
            })
            .await;

        if terminal.state != JobState::Done {
            let message = terminal.message.clone().unwrap_or_else(|| match terminal.state {
                JobState::NotFound => "The server no longer recognizes this job".to_string(),
                _ => "Indexing failed on the server".to_string(),
            });
            warn!(file = %file.name, job = %handle, "indexing failed: {}", message);
            session.apply(&file.name, TaskStatus::Error, message, None);
            report.failed += 1;
            return;
        }

        session.apply(
            &file.name,
            TaskStatus::Saving,
            "Registering document metadata...",
            None,
        );

        let title = derived_title(&file.name);
        let meta = NewDocument {
            file_name: file.name.clone(),
            pages: terminal.pages,
            chunks: terminal.chunks,
        };

        match document_repo::register_if_absent(&self.db, &scope.id, &title, &meta) {
            Ok(_inserted) => {
                session.apply(&file.name, TaskStatus::Done, done_message(&terminal), None);
                report.indexed += 1;
            }
            Err(e) => {
                warn!(file = %file.name, "metadata registration failed: {}", e);
                session.apply(
                    &file.name,
                    TaskStatus::Error,
                    format!("Indexed, but metadata registration failed: {}", e),
                    None,
                );
                report.failed += 1;
            }
        }
    }
}

fn done_message(snapshot: &JobSnapshot) -> String {
    match (snapshot.pages, snapshot.chunks) {
        (Some(pages), Some(chunks)) => {
            format!("Indexed {} pages into {} chunks", pages, chunks)
        }
        _ => "Indexing complete".to_string(),
    }
}
