//! Batch-level duplicate detection.
//!
//! The backend's duplicate-check endpoint is authoritative (it consults
//! the vector store and on-disk corpus). When it is unreachable the
//! detector degrades to matching candidate names against the local
//! metadata store, and when that fails too it reports no duplicates.
//! A failed check must never block the batch.

use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::backend::client::IndexBackend;
use crate::meta::{document_repo, Database};

/// Title derived from a file name: the display name with its format
/// extension stripped. Metadata records are keyed by this.
pub fn derived_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

pub struct DuplicateDetector<'a, B: IndexBackend + ?Sized> {
    backend: &'a B,
    db: &'a Database,
}

impl<'a, B: IndexBackend + ?Sized> DuplicateDetector<'a, B> {
    pub fn new(backend: &'a B, db: &'a Database) -> Self {
        Self { backend, db }
    }

    /// Returns the subset of `candidates` that is already indexed.
    ///
    /// Never fails: any error degrades to the metadata fallback or to an
    /// empty set. The fallback may under- or over-report relative to the
    /// true backend index.
    pub async fn detect(&self, scope_id: &str, candidates: &[String]) -> HashSet<String> {
        match self.backend.check_duplicates(candidates).await {
            Ok(duplicates) => duplicates.into_iter().collect(),
            Err(e) => {
                warn!(
                    "duplicate check unavailable, falling back to metadata store: {}",
                    e
                );
                self.fallback(scope_id, candidates)
            }
        }
    }

    /// Best-effort fallback: a candidate counts as a duplicate when a
    /// metadata record with its derived title exists in the scope.
    fn fallback(&self, scope_id: &str, candidates: &[String]) -> HashSet<String> {
        let titles = match document_repo::find_titles_in_scope(self.db, scope_id) {
            Ok(titles) => titles,
            Err(e) => {
                warn!("metadata fallback failed, assuming no duplicates: {}", e);
                return HashSet::new();
            }
        };

        let known: HashSet<String> = titles.into_iter().map(|t| t.to_lowercase()).collect();

        candidates
            .iter()
            .filter(|name| known.contains(&derived_title(name).to_lowercase()))
            .cloned()
            .collect()
    }
}
