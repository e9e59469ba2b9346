//! # Local Repository Inventory
//!
//! Scans the configured group directories for version-controlled local
//! copies. Only the immediate children of each group directory are
//! considered, and a child only counts as a local repository if it carries
//! a `.git` marker (directory or file, so worktree-style clones count too).
//!
//! The snapshot maps each local path to the canonical identifier of the
//! repository believed to live there: short names are resolved through the
//! remote index, and children the index cannot resolve get a synthesized
//! `<owner>/<short>` identifier so the cleaner can still run its targeted
//! existence probe against them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::remote_index::RemoteIndex;

/// Snapshot of version-controlled directories under the group directories.
#[derive(Debug, Default)]
pub struct LocalInventory {
    ids: HashSet<String>,
    by_path: HashMap<PathBuf, String>,
}

/// Whether a directory carries a version-control marker.
pub fn has_vcs_marker(dir: &Path) -> bool {
    dir.join(".git").exists()
}

impl LocalInventory {
    /// Scan the immediate children of each group directory.
    ///
    /// Runs single-threaded before (or after) the execution waves; resolving
    /// unseen short names may lazily fill the remote index.
    pub fn scan(group_dirs: &[PathBuf], index: &mut RemoteIndex) -> Self {
        let mut inventory = Self::default();

        for dir in group_dirs {
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_dir() || !has_vcs_marker(entry.path()) {
                    continue;
                }

                let short = entry.file_name().to_string_lossy().into_owned();
                let id = index
                    .resolve(&short)
                    .unwrap_or_else(|| format!("{}/{}", index.owner(), short));
                debug!("inventory: {} -> {}", entry.path().display(), id);
                inventory.ids.insert(id.clone());
                inventory.by_path.insert(entry.path().to_path_buf(), id);
            }
        }

        inventory
    }

    /// Whether a canonical identifier is believed present locally.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Canonical identifiers believed present locally.
    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Local path → canonical identifier map.
    pub fn by_path(&self) -> &HashMap<PathBuf, String> {
        &self.by_path
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
