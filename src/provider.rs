//! # Source Control Provider
//!
//! Remote-side collaborator: bulk listing of canonical identifiers,
//! per-repository metadata, existence probes, the authenticated identity,
//! and the fork-to-upstream sync primitive.
//!
//! The interface is a trait so the planner, cleaner and scheduler can be
//! exercised against deterministic test doubles without network access. The
//! default implementation shells out to the `gh` CLI, which automatically
//! handles:
//! - Stored OAuth tokens from `gh auth login`
//! - `GH_TOKEN` / `GITHUB_TOKEN` environment variables
//! - Enterprise hosts configured in `~/.config/gh/hosts.yml`

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A named GraphQL node, e.g. `{"name": "main"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedNode {
    pub name: String,
}

/// Per-repository metadata as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    pub name_with_owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_language: Option<NamedNode>,
    #[serde(default)]
    pub stargazer_count: u64,
    #[serde(default)]
    pub fork_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub default_branch_ref: Option<NamedNode>,
}

impl RepoInfo {
    /// The repository's default branch, falling back to `main` when the
    /// provider reports none (empty repositories).
    pub fn default_branch(&self) -> &str {
        self.default_branch_ref
            .as_ref()
            .map(|n| n.name.as_str())
            .unwrap_or("main")
    }

    /// The repository's primary language, if any.
    pub fn primary_language(&self) -> Option<&str> {
        self.primary_language.as_ref().map(|n| n.name.as_str())
    }
}

/// Trait for provider operations - allows mocking in tests
pub trait Provider: Send + Sync {
    /// List up to `limit` canonical identifiers (`owner/name`) visible to
    /// the authenticated identity.
    fn list_repo_ids(&self, limit: usize) -> Result<Vec<String>>;

    /// Fetch metadata for a single repository. `Ok(None)` means the
    /// repository does not exist; `Err` means the probe itself failed.
    fn repo_info(&self, id: &str) -> Result<Option<RepoInfo>>;

    /// The login of the authenticated identity, used as the assumed owner
    /// for single-name fallback resolution.
    fn viewer_login(&self) -> Result<String>;

    /// Sync a local fork clone at `dest` with its upstream on `branch`.
    fn sync_fork(&self, dest: &Path, branch: &str) -> Result<()>;
}

/// The default implementation of [`Provider`], backed by the `gh` CLI.
pub struct GhProvider;

/// JSON fields requested from `gh repo view`.
const REPO_VIEW_FIELDS: &str = "nameWithOwner,description,primaryLanguage,stargazerCount,\
                                forkCount,updatedAt,isArchived,isPrivate,defaultBranchRef";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    name_with_owner: String,
}

impl GhProvider {
    pub fn new() -> Self {
        Self
    }

    /// Run `gh` with the given arguments, capturing output.
    fn run(args: &[&str], dir: Option<&Path>) -> Result<std::process::Output> {
        let mut cmd = Command::new("gh");
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.output().map_err(|e| Error::Provider {
            command: format!("gh {}", args.join(" ")),
            message: e.to_string(),
        })
    }

    /// Run `gh` and require a successful exit, returning stdout.
    fn run_ok(args: &[&str], dir: Option<&Path>) -> Result<String> {
        let output = Self::run(args, dir)?;
        if !output.status.success() {
            return Err(Error::Provider {
                command: format!("gh {}", args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GhProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a `gh` stderr message indicates a nonexistent repository rather
/// than an infrastructure failure.
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("Could not resolve to a Repository")
        || stderr.contains("HTTP 404")
        || stderr.contains("Not Found")
}

impl Provider for GhProvider {
    fn list_repo_ids(&self, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let stdout = Self::run_ok(
            &[
                "repo",
                "list",
                "--limit",
                &limit,
                "--json",
                "nameWithOwner",
            ],
            None,
        )?;

        let entries: Vec<ListEntry> = serde_json::from_str(&stdout)?;
        Ok(entries.into_iter().map(|e| e.name_with_owner).collect())
    }

    fn repo_info(&self, id: &str) -> Result<Option<RepoInfo>> {
        let output = Self::run(&["repo", "view", id, "--json", REPO_VIEW_FIELDS], None)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found(&stderr) {
                return Ok(None);
            }
            return Err(Error::Provider {
                command: format!("gh repo view {}", id),
                message: stderr.trim().to_string(),
            });
        }

        let info: RepoInfo = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;
        Ok(Some(info))
    }

    fn viewer_login(&self) -> Result<String> {
        let stdout = Self::run_ok(&["api", "user", "--jq", ".login"], None)?;
        Ok(stdout.trim().to_string())
    }

    fn sync_fork(&self, dest: &Path, branch: &str) -> Result<()> {
        Self::run_ok(&["repo", "sync", "--branch", branch], Some(dest))?;
        Ok(())
    }
}
