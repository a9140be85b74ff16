//! Per-file organizing pipeline
//!
//! The [`Organizer`] is an explicit context object: every collaborator
//! (tag source, catalog lookup, reconciler, progress store) is injected
//! once at construction, so nothing in the pipeline touches process-wide
//! state and tests can substitute stubs freely.
//!
//! ## Per-file state machine
//!
//! Discovered -> (skip if Completed) -> Extracted -> Looked-Up ->
//! Reconciled -> Placed(=Completed), with Skipped reachable from any
//! stage on error. Each file runs behind its own error boundary; a
//! failure affects that file alone and leaves it unprogressed so the
//! next run retries it from scratch.
//!
//! ## Concurrency
//!
//! Files are independent and run on a bounded worker pool. A per-path
//! async lock serializes check-and-commit for one source path; distinct
//! paths share no mutable state. Cancelling a run is safe at any point:
//! only files that reached the Completed write count as done.

use crate::error::{OrganizeError, Result};
use crate::layout;
use crate::scanner;
use core_metadata::extractor::TagSource;
use core_metadata::providers::{CatalogLookup, TrackQuery};
use core_metadata::reconciler::MetadataReconciler;
use core_store::{ProgressStatus, ProgressStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Terminal state of one file within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Moved to `target` and committed to the progress store.
    Organized { target: PathBuf },
    /// A Completed record already existed; nothing was touched.
    AlreadyOrganized,
    /// A stage failed; the file stays where it is and is retried on the
    /// next run.
    Skipped { reason: String },
}

/// Aggregate counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub discovered: usize,
    pub organized: usize,
    pub already_organized: usize,
    pub skipped: usize,
}

/// Per-path async locks serializing check-and-commit for a source path.
#[derive(Default)]
struct PathLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    async fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        Arc::clone(map.entry(path.to_path_buf()).or_default())
    }
}

/// Explicit pipeline context driving the per-file state machine.
pub struct Organizer {
    tags: Arc<dyn TagSource>,
    catalogs: Arc<CatalogLookup>,
    reconciler: Arc<MetadataReconciler>,
    store: Arc<dyn ProgressStore>,
    output_root: PathBuf,
    worker_count: usize,
    locks: PathLocks,
}

impl Organizer {
    pub fn new(
        tags: Arc<dyn TagSource>,
        catalogs: Arc<CatalogLookup>,
        reconciler: Arc<MetadataReconciler>,
        store: Arc<dyn ProgressStore>,
        output_root: impl Into<PathBuf>,
        worker_count: usize,
    ) -> Self {
        Self {
            tags,
            catalogs,
            reconciler,
            store,
            output_root: output_root.into(),
            worker_count: worker_count.max(1),
            locks: PathLocks::default(),
        }
    }

    /// Organize every audio file under `input_root`.
    ///
    /// A run that exhausts the file list with individual skips is a
    /// normal, successful run.
    pub async fn run(self: &Arc<Self>, input_root: &Path) -> Result<OrganizeSummary> {
        let files = scanner::scan_directory(input_root)?;
        let mut summary = OrganizeSummary {
            discovered: files.len(),
            ..Default::default()
        };

        info!(
            "Discovered {} audio files under {}",
            files.len(),
            input_root.display()
        );

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut tasks = JoinSet::new();

        for path in files {
            let organizer = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return FileOutcome::Skipped {
                            reason: "worker pool shut down".to_string(),
                        }
                    }
                };
                organizer.process_file(&path).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FileOutcome::Organized { .. }) => summary.organized += 1,
                Ok(FileOutcome::AlreadyOrganized) => summary.already_organized += 1,
                Ok(FileOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    error!("Worker task failed: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        info!(
            organized = summary.organized,
            already_organized = summary.already_organized,
            skipped = summary.skipped,
            "Run complete"
        );

        Ok(summary)
    }

    /// Process one file to a terminal outcome.
    ///
    /// Never returns an error: every stage failure is absorbed here so
    /// the rest of the batch continues.
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let lock = self.locks.for_path(path).await;
        let _guard = lock.lock().await;

        match self.try_process(path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file");
                FileOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_process(&self, path: &Path) -> Result<FileOutcome> {
        let key = path.to_string_lossy();

        if let Some(record) = self.store.lookup(&key).await? {
            if record.status == ProgressStatus::Completed {
                info!(path = %path.display(), "File already organized");
                return Ok(FileOutcome::AlreadyOrganized);
            }
        }

        let tags = self.tags.extract(path).await?;
        let query = TrackQuery::from_tags(&tags);
        let findings = self.catalogs.lookup(&query).await;
        let metadata = self.reconciler.reconcile(path, &tags, &findings).await?;

        let target = self.output_root.join(layout::target_path(&metadata));
        self.place(path, &target).await?;

        if let Err(e) = self
            .store
            .mark_completed(&key, &target.to_string_lossy())
            .await
        {
            // The move already happened; without a record the next run
            // retries this path and refuses the occupied target.
            error!(path = %path.display(), error = %e, "Move succeeded but progress write failed");
            return Ok(FileOutcome::Skipped {
                reason: format!("progress write failed: {}", e),
            });
        }

        info!(path = %path.display(), target = %target.display(), "File organized");

        Ok(FileOutcome::Organized { target })
    }

    /// Move `source` to `target`, creating missing directories.
    /// An already-occupied target is refused, never overwritten.
    async fn place(&self, source: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OrganizeError::Placement {
                    path: source.to_path_buf(),
                    reason: format!("failed to create {}: {}", parent.display(), e),
                })?;
        }

        match tokio::fs::try_exists(target).await {
            Ok(true) => {
                return Err(OrganizeError::Placement {
                    path: source.to_path_buf(),
                    reason: format!("target already exists: {}", target.display()),
                });
            }
            Ok(false) => {}
            Err(e) => {
                return Err(OrganizeError::Placement {
                    path: source.to_path_buf(),
                    reason: format!("cannot inspect target {}: {}", target.display(), e),
                });
            }
        }

        tokio::fs::rename(source, target)
            .await
            .map_err(|e| OrganizeError::Placement {
                path: source.to_path_buf(),
                reason: format!("move to {} failed: {}", target.display(), e),
            })
    }
}
