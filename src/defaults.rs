//! Default values for repo-mirror configuration.
//!
//! This module provides centralized default values used across the CLI and
//! library, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Default name of the grouping configuration document, looked up relative
/// to the mirror root.
pub const CONFIG_FILE: &str = "repos.md";

/// Subdirectory of the mirror root that holds the per-group directories.
pub const REPOS_SUBDIR: &str = "repos";

/// Default number of concurrent workers per execution wave.
///
/// Can be overridden with the `--jobs` CLI flag or the `REPO_MIRROR_JOBS`
/// environment variable.
pub const MAX_WORKERS: usize = 5;

/// Maximum number of canonical identifiers requested from the provider's
/// bulk listing. Short names beyond this cap fall back to per-repository
/// probing during planning.
pub const REPO_LIST_CAP: usize = 1000;

/// Returns the default mirror root directory.
///
/// Uses the current working directory, falling back to the user's home
/// directory if the working directory cannot be determined.
///
/// This can be overridden by the `--root` CLI flag or the
/// `REPO_MIRROR_ROOT` environment variable.
pub fn default_root() -> PathBuf {
    std::env::current_dir()
        .ok()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
