//! # Reconciliation Planner
//!
//! Computes the diff between the declared configuration and on-disk state.
//! Every configured repository lands in exactly one bucket:
//!
//! - **Missing**: resolvable remotely, no local copy. Schedule a clone.
//! - **ToUpdate**: a version-controlled copy exists (possibly after
//!   migrating a deprecated flat-layout checkout): schedule an update.
//! - **Skipped**: something that is not a repository occupies the target
//!   path; never touched, never a failure.
//! - **Unresolvable**: no canonical identifier could be determined;
//!   excluded from execution and reported separately.
//!
//! The flattened task list orders every Missing task (across all groups)
//! before every ToUpdate task, preserving discovery order within each tier,
//! so that restoring existence always takes precedence over refreshing.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::catalog::Group;
use crate::remote_index::RemoteIndex;

/// What a task does to its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Clone,
    Update,
}

/// Scheduling tier: clones restore completeness and run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Low,
}

/// One unit of repository work, created during planning and mutated only by
/// the scheduler and retry coordinator.
#[derive(Debug, Clone)]
pub struct SyncTask {
    /// Canonical `owner/name` identifier.
    pub id: String,
    /// Short name, also the local directory name.
    pub short: String,
    /// Destination directory of the local copy.
    pub dest: PathBuf,
    pub kind: TaskKind,
    pub priority: Priority,
    /// Number of execution attempts so far.
    pub attempts: u32,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

impl SyncTask {
    fn new(id: String, short: String, dest: PathBuf, kind: TaskKind) -> Self {
        let priority = match kind {
            TaskKind::Clone => Priority::High,
            TaskKind::Update => Priority::Low,
        };
        Self {
            id,
            short,
            dest,
            kind,
            priority,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Per-group classification buckets.
#[derive(Debug, Clone, Default)]
pub struct GroupPlan {
    pub group: String,
    /// Canonical ids to clone.
    pub missing: Vec<String>,
    /// Canonical ids to update.
    pub to_update: Vec<String>,
    /// Short names whose target path is occupied by a non-repository.
    pub skipped: Vec<String>,
    /// Short names with no canonical identifier.
    pub unresolvable: Vec<String>,
}

impl GroupPlan {
    /// Total classified entries; equals the group's configured repo count.
    pub fn total(&self) -> usize {
        self.missing.len() + self.to_update.len() + self.skipped.len() + self.unresolvable.len()
    }
}

/// The full reconciliation plan: per-group buckets plus the flattened,
/// priority-ordered task list.
#[derive(Debug, Default)]
pub struct DiffPlan {
    pub groups: Vec<GroupPlan>,
    pub tasks: Vec<SyncTask>,
}

impl DiffPlan {
    pub fn missing_count(&self) -> usize {
        self.groups.iter().map(|g| g.missing.len()).sum()
    }

    pub fn to_update_count(&self) -> usize {
        self.groups.iter().map(|g| g.to_update.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.groups.iter().map(|g| g.skipped.len()).sum()
    }

    pub fn unresolvable_count(&self) -> usize {
        self.groups.iter().map(|g| g.unresolvable.len()).sum()
    }
}

/// Classify every configured repository, migrating deprecated flat-layout
/// checkouts along the way.
///
/// Runs single-threaded before the execution waves; this is the only place
/// where lazy index resolution happens for configured names.
pub fn compute(groups: &[Group], root: &Path, index: &mut RemoteIndex) -> DiffPlan {
    let mut plan = DiffPlan::default();
    let mut clone_tasks: Vec<SyncTask> = Vec::new();
    let mut update_tasks: Vec<SyncTask> = Vec::new();

    for group in groups {
        let group_dir = group.target_dir(root);
        let mut bucket = GroupPlan {
            group: group.name.clone(),
            ..GroupPlan::default()
        };

        for short in &group.repos {
            let Some(id) = index.resolve(short) else {
                debug!("{}: no canonical id for '{}'", group.name, short);
                bucket.unresolvable.push(short.clone());
                continue;
            };

            let dest = group_dir.join(short);
            let legacy = root.join(short);

            if dest.join(".git").exists() {
                bucket.to_update.push(id.clone());
                update_tasks.push(SyncTask::new(id, short.clone(), dest, TaskKind::Update));
            } else if legacy.join(".git").exists() {
                migrate_legacy(&legacy, &dest);
                bucket.to_update.push(id.clone());
                update_tasks.push(SyncTask::new(id, short.clone(), dest, TaskKind::Update));
            } else if dest.exists() {
                debug!("{}: non-repository at {}", group.name, dest.display());
                bucket.skipped.push(short.clone());
            } else {
                bucket.missing.push(id.clone());
                clone_tasks.push(SyncTask::new(id, short.clone(), dest, TaskKind::Clone));
            }
        }

        plan.groups.push(bucket);
    }

    plan.tasks = clone_tasks;
    plan.tasks.append(&mut update_tasks);
    plan
}

/// Best-effort move of a flat-layout checkout into its group directory.
///
/// A failed move is not fatal here: the repository stays classified as
/// ToUpdate and the broken destination surfaces as an update failure.
fn migrate_legacy(legacy: &Path, dest: &Path) {
    let result = (|| {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(legacy, dest)
    })();

    match result {
        Ok(()) => debug!(
            "migrated legacy checkout {} -> {}",
            legacy.display(),
            dest.display()
        ),
        Err(e) => warn!(
            "could not migrate legacy checkout {} -> {}: {}",
            legacy.display(),
            dest.display(),
            e
        ),
    }
}
