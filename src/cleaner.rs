//! # Reconciliation Cleaner
//!
//! Prunes local copies whose repository no longer exists upstream. A
//! directory survives cleanup if any of these hold:
//!
//! - its canonical id is expected by this run's configuration,
//! - its canonical id is still present in the bulk remote index (the
//!   repository merely belongs to a group outside this run's selection),
//! - a targeted existence probe under the assumed owner finds it.
//!
//! Only when all three miss is the directory removed recursively and the
//! deletion counted. Directories without a version-control marker are never
//! deletion candidates, and a per-directory failure never aborts the rest
//! of the sweep.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::inventory::{has_vcs_marker, LocalInventory};
use crate::provider::Provider;
use crate::remote_index::RemoteIndex;
use crate::report::{FailureCategory, FailureRecord};

/// What the cleanup sweep did.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Directories that were removed.
    pub deleted: Vec<PathBuf>,
    /// Per-directory failures (probe errors, undeletable trees).
    pub failures: Vec<FailureRecord>,
}

pub struct ReconciliationCleaner<'a> {
    index: &'a RemoteIndex,
    provider: &'a dyn Provider,
}

impl<'a> ReconciliationCleaner<'a> {
    pub fn new(index: &'a RemoteIndex, provider: &'a dyn Provider) -> Self {
        Self { index, provider }
    }

    /// Sweep the inventoried directories against the expected set.
    pub fn clean(&self, inventory: &LocalInventory, expected: &HashSet<String>) -> CleanupReport {
        let mut report = CleanupReport::default();

        // Deterministic sweep order keeps reports stable across runs.
        let mut entries: Vec<_> = inventory.by_path().iter().collect();
        entries.sort();

        for (path, id) in entries {
            if expected.contains(id) {
                continue;
            }
            if self.index.contains_id(id) {
                debug!("{}: {} belongs to an unselected group", path.display(), id);
                continue;
            }

            match self.provider.repo_info(id) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    // No positive evidence of absence: keep the directory.
                    warn!("existence probe for {} failed: {}", id, e);
                    report.failures.push(FailureRecord {
                        id: id.clone(),
                        category: FailureCategory::Cleanup,
                        message: format!("existence probe failed: {}", e),
                    });
                    continue;
                }
            }

            if !has_vcs_marker(path) {
                continue;
            }

            match fs::remove_dir_all(path) {
                Ok(()) => {
                    info!("deleted {} ({} is gone upstream)", path.display(), id);
                    report.deleted.push(path.clone());
                }
                Err(e) => {
                    report.failures.push(FailureRecord {
                        id: id.clone(),
                        category: FailureCategory::Cleanup,
                        message: format!("could not delete {}: {}", path.display(), e),
                    });
                }
            }
        }

        report
    }
}
