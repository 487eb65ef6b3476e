//! Cooperative status polling.
//!
//! The backend is fire-and-poll: submitting a file returns a job id and
//! the client re-reads `GET /upload/status/{id}` until a terminal state
//! shows up. [`poll_until`] is the generic retry primitive; [`JobPoller`]
//! wires it to the indexing backend and normalizes progress for display.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::client::IndexBackend;
use super::types::{JobHandle, JobSnapshot};

/// Polls `fetch` until `is_terminal` accepts a result or `max_attempts`
/// fetches have happened, sleeping `interval` between attempts.
///
/// Non-terminal results are forwarded to `on_pending`. Fetch errors are
/// treated as transient: they are logged and the loop simply retries on
/// the next tick. The attempt ceiling is the only abort condition, and
/// exactly `max_attempts` fetches occur when nothing terminal arrives.
pub async fn poll_until<T, E, F, Fut>(
    mut fetch: F,
    is_terminal: impl Fn(&T) -> bool,
    mut on_pending: impl FnMut(&T),
    interval: Duration,
    max_attempts: u32,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=max_attempts {
        match fetch().await {
            Ok(result) if is_terminal(&result) => return Some(result),
            Ok(result) => on_pending(&result),
            Err(e) => debug!(attempt, "transient poll error: {}", e),
        }

        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    None
}

/// Polls one indexing job to completion.
pub struct JobPoller<'a, B: IndexBackend + ?Sized> {
    backend: &'a B,
    interval: Duration,
    max_attempts: u32,
}

impl<'a, B: IndexBackend + ?Sized> JobPoller<'a, B> {
    pub fn new(backend: &'a B, interval: Duration, max_attempts: u32) -> Self {
        Self {
            backend,
            interval,
            max_attempts,
        }
    }

    /// Polls until the backend reports `done`, `error`, or `not_found`.
    ///
    /// Intermediate snapshots go to `on_progress`. If the attempt ceiling
    /// is reached first, a synthetic error snapshot with a timeout message
    /// is returned; the backend never reports "too slow" itself.
    pub async fn poll(
        &self,
        handle: &JobHandle,
        mut on_progress: impl FnMut(&JobSnapshot),
    ) -> JobSnapshot {
        let backend = self.backend;
        let terminal = poll_until(
            move || backend.job_status(handle),
            JobSnapshot::is_terminal,
            &mut on_progress,
            self.interval,
            self.max_attempts,
        )
        .await;

        match terminal {
            Some(snapshot) => snapshot,
            None => {
                let elapsed = self.interval * self.max_attempts;
                debug!(job = %handle, "polling ceiling reached");
                JobSnapshot::timed_out(elapsed.as_secs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::backend::error::BackendError;
    use crate::backend::types::{JobState, UploadFile, UploadOutcome};

    use super::*;

    struct ScriptedBackend {
        snapshots: Mutex<VecDeque<Result<JobSnapshot, BackendError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(snapshots: Vec<Result<JobSnapshot, BackendError>>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl IndexBackend for ScriptedBackend {
        async fn check_duplicates(&self, _: &[String]) -> Result<Vec<String>, BackendError> {
            Ok(vec![])
        }

        async fn submit(
            &self,
            _: &UploadFile,
            _: Option<&str>,
        ) -> Result<UploadOutcome, BackendError> {
            unimplemented!("not used by poller tests")
        }

        async fn job_status(&self, _: &JobHandle) -> Result<JobSnapshot, BackendError> {
            *self.calls.lock().unwrap() += 1;
            self.snapshots
                .lock()
                .unwrap()
                .pop_front()
                // Once the script runs out, keep reporting a non-terminal state.
                .unwrap_or_else(|| Ok(snapshot(JobState::Extracting, None)))
        }
    }

    fn snapshot(state: JobState, progress: Option<f64>) -> JobSnapshot {
        JobSnapshot {
            state,
            message: None,
            progress,
            pages: None,
            chunks: None,
        }
    }

    #[tokio::test]
    async fn test_poll_until_stops_at_terminal() {
        let mut fetches = 0;
        let result = poll_until(
            || {
                fetches += 1;
                let value = if fetches < 3 { 0 } else { 7 };
                async move { Ok::<_, BackendError>(value) }
            },
            |v| *v == 7,
            |_| {},
            Duration::ZERO,
            100,
        )
        .await;

        assert_eq!(result, Some(7));
        assert_eq!(fetches, 3);
    }

    #[tokio::test]
    async fn test_poll_until_exact_attempt_ceiling() {
        let mut fetches = 0;
        let result = poll_until(
            || {
                fetches += 1;
                async { Ok::<_, BackendError>(0) }
            },
            |v| *v == 7,
            |_| {},
            Duration::ZERO,
            5,
        )
        .await;

        assert_eq!(result, None);
        assert_eq!(fetches, 5, "must fetch exactly max_attempts times");
    }

    #[tokio::test]
    async fn test_poll_until_swallows_transient_errors() {
        let mut fetches = 0;
        let result = poll_until(
            || {
                fetches += 1;
                let outcome = if fetches < 4 {
                    Err(BackendError::Malformed("blip".to_string()))
                } else {
                    Ok(7)
                };
                async move { outcome }
            },
            |v| *v == 7,
            |_| {},
            Duration::ZERO,
            10,
        )
        .await;

        assert_eq!(result, Some(7));
        assert_eq!(fetches, 4);
    }

    #[tokio::test]
    async fn test_poll_until_forwards_pending_values() {
        let mut fetches = 0;
        let mut pending = Vec::new();
        poll_until(
            || {
                fetches += 1;
                let value = fetches;
                async move { Ok::<_, BackendError>(value) }
            },
            |v| *v == 3,
            |v| pending.push(*v),
            Duration::ZERO,
            10,
        )
        .await;

        assert_eq!(pending, vec![1, 2], "terminal value must not reach on_pending");
    }

    #[tokio::test]
    async fn test_job_poller_reaches_done() {
        let backend = ScriptedBackend::new(vec![
            Ok(snapshot(JobState::Extracting, None)),
            Ok(snapshot(JobState::Embedding, Some(47.0))),
            Ok(snapshot(JobState::Done, None)),
        ]);
        let poller = JobPoller::new(&backend, Duration::ZERO, 10);

        let mut seen = Vec::new();
        let terminal = poller
            .poll(&JobHandle("job-1".to_string()), |s| {
                seen.push((s.state, s.percent()))
            })
            .await;

        assert_eq!(terminal.state, JobState::Done);
        assert_eq!(
            seen,
            vec![
                (JobState::Extracting, Some(10)),
                (JobState::Embedding, Some(47)),
            ]
        );
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_job_poller_times_out_with_synthetic_error() {
        let backend = ScriptedBackend::new(vec![]);
        let poller = JobPoller::new(&backend, Duration::ZERO, 3);

        let terminal = poller
            .poll(&JobHandle("job-slow".to_string()), |_| {})
            .await;

        assert_eq!(terminal.state, JobState::Error);
        assert!(terminal.message.unwrap().contains("did not finish"));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_job_poller_not_found_is_terminal() {
        let backend = ScriptedBackend::new(vec![Ok(snapshot(JobState::NotFound, None))]);
        let poller = JobPoller::new(&backend, Duration::ZERO, 10);

        let terminal = poller
            .poll(&JobHandle("job-gone".to_string()), |_| {})
            .await;

        assert_eq!(terminal.state, JobState::NotFound);
        assert_eq!(backend.calls(), 1);
    }
}
