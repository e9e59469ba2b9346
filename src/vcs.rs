//! # Version-Control Operations
//!
//! The per-repository work unit: cloning a missing repository and updating
//! an existing one. Exposed as the [`Vcs`] trait so the scheduler and retry
//! coordinator can run against deterministic test doubles; the real
//! implementation drives the system `git` command, which automatically
//! handles SSH keys, credential helpers and tokens configured in
//! `~/.gitconfig` (same approach as any stock git workflow).
//!
//! ## Update algorithm
//!
//! Before pulling, a detached HEAD is moved to the provider-reported
//! default branch and uncommitted changes are stashed. The pull itself is
//! an escalating fallback chain, each step aborting any stuck state left by
//! the previous one and short-circuiting on first success:
//!
//! 1. provider-assisted fork sync to upstream, when an `upstream` remote is
//!    configured;
//! 2. rebase-pull from `origin` on the current branch;
//! 3. abort any stuck rebase, then a plain merge-pull on the named branch;
//! 4. abort any stuck merge, then an unqualified `git pull` using the
//!    repository's inferred defaults.
//!
//! The stash, if one was created, is restored whether the chain succeeded
//! or not. Exhausting all four steps is a failure.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::provider::Provider;

/// Trait for repository operations - allows mocking in tests
pub trait Vcs: Send + Sync {
    /// Clone `id` into `dest`. `dest` must not contain a repository.
    fn clone_repo(&self, id: &str, dest: &Path) -> Result<()>;

    /// Bring the existing repository at `dest` up to date.
    fn update_repo(&self, id: &str, dest: &Path) -> Result<()>;
}

/// The default implementation of [`Vcs`], which shells out to the system
/// `git` command.
pub struct GitVcs {
    provider: Arc<dyn Provider>,
}

impl GitVcs {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    fn repo_url(id: &str) -> String {
        format!("https://github.com/{}.git", id)
    }

    /// The escalating pull chain. `branch` is the branch HEAD sits on after
    /// the preamble.
    fn pull_chain(&self, dest: &Path, branch: &str) -> Result<()> {
        if git_ok(dest, &["remote", "get-url", "upstream"]) {
            match self.provider.sync_fork(dest, branch) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("fork sync failed in {}: {}", dest.display(), e),
            }
        }

        if git_ok(dest, &["pull", "--rebase", "origin", branch]) {
            return Ok(());
        }

        let _ = run_git(Some(dest), &["rebase", "--abort"]);
        if git_ok(dest, &["pull", "origin", branch]) {
            return Ok(());
        }

        let _ = run_git(Some(dest), &["merge", "--abort"]);
        let output = run_git(Some(dest), &["pull"])?;
        if output.status.success() {
            return Ok(());
        }

        Err(Error::Git {
            command: "git pull".to_string(),
            dir: dest.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Vcs for GitVcs {
    fn clone_repo(&self, id: &str, dest: &Path) -> Result<()> {
        // Leftovers from an earlier failed clone would make git refuse the
        // destination; the planner only schedules clones for paths that had
        // no repository.
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = Self::repo_url(id);
        let dest_str = dest.display().to_string();
        let output = run_git(None, &["clone", &url, &dest_str])?;
        if !output.status.success() {
            return Err(Error::Git {
                command: format!("git clone {}", url),
                dir: dest.display().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn update_repo(&self, id: &str, dest: &Path) -> Result<()> {
        if is_detached(dest) {
            let branch = match self.provider.repo_info(id) {
                Ok(Some(info)) => info.default_branch().to_string(),
                Ok(None) => "main".to_string(),
                Err(e) => {
                    warn!("default branch lookup for {} failed: {}", id, e);
                    "main".to_string()
                }
            };
            if !git_ok(dest, &["checkout", &branch]) {
                warn!(
                    "could not leave detached HEAD in {} (checkout {})",
                    dest.display(),
                    branch
                );
            }
        }

        let stashed = is_dirty(dest) && git_ok(dest, &["stash", "push", "-u"]);
        let branch = current_branch(dest)?;
        let result = self.pull_chain(dest, &branch);

        if stashed && !git_ok(dest, &["stash", "pop"]) {
            warn!(
                "could not restore stashed changes in {}; they remain in the stash",
                dest.display()
            );
        }

        result
    }
}

/// Run git with the given arguments, capturing output.
fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<Output> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    cmd.output().map_err(|e| Error::Git {
        command: format!("git {}", args.join(" ")),
        dir: dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string()),
        stderr: e.to_string(),
    })
}

/// Whether a git command in `dir` exits successfully.
fn git_ok(dir: &Path, args: &[&str]) -> bool {
    run_git(Some(dir), args)
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// The branch HEAD currently sits on.
fn current_branch(dir: &Path) -> Result<String> {
    let output = run_git(Some(dir), &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if !output.status.success() {
        return Err(Error::Git {
            command: "git rev-parse --abbrev-ref HEAD".to_string(),
            dir: dir.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether HEAD is detached.
fn is_detached(dir: &Path) -> bool {
    !git_ok(dir, &["symbolic-ref", "-q", "HEAD"])
}

/// Whether the working tree has uncommitted changes.
fn is_dirty(dir: &Path) -> bool {
    run_git(Some(dir), &["status", "--porcelain"])
        .map(|o| o.status.success() && !o.stdout.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{NamedNode, RepoInfo};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct StubProvider;

    impl Provider for StubProvider {
        fn list_repo_ids(&self, _limit: usize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn repo_info(&self, id: &str) -> Result<Option<RepoInfo>> {
            Ok(Some(RepoInfo {
                name_with_owner: id.to_string(),
                description: None,
                primary_language: None,
                stargazer_count: 0,
                fork_count: 0,
                updated_at: None,
                is_archived: false,
                is_private: false,
                default_branch_ref: Some(NamedNode {
                    name: "main".to_string(),
                }),
            }))
        }
        fn viewer_login(&self) -> Result<String> {
            Ok("acme".to_string())
        }
        fn sync_fork(&self, _dest: &Path, _branch: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_repo_url_from_canonical_id() {
        assert_eq!(
            GitVcs::repo_url("acme/alpha"),
            "https://github.com/acme/alpha.git"
        );
    }

    // ------------------------------------------------------------------
    // Integration tests against a real git binary and local repositories.
    // Cloning through GitVcs needs network access, so only the update
    // paths are exercised here.
    // ------------------------------------------------------------------

    fn sh_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed in {:?}", args, dir);
    }

    /// A bare origin, a seed checkout pushing to it, and a clone under test.
    fn fixture(temp: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let origin = temp.path().join("origin.git");
        let seed = temp.path().join("seed");
        let dest = temp.path().join("dest");

        fs::create_dir_all(&origin).unwrap();
        sh_git(&origin, &["init", "--bare", "-b", "main", "."]);

        fs::create_dir_all(&seed).unwrap();
        sh_git(&seed, &["init", "-b", "main", "."]);
        sh_git(&seed, &["config", "user.email", "test@example.com"]);
        sh_git(&seed, &["config", "user.name", "Test"]);
        fs::write(seed.join("a.txt"), "one").unwrap();
        sh_git(&seed, &["add", "."]);
        sh_git(&seed, &["commit", "-m", "one"]);
        sh_git(&seed, &["remote", "add", "origin", origin.to_str().unwrap()]);
        sh_git(&seed, &["push", "origin", "main"]);

        sh_git(
            temp.path(),
            &["clone", origin.to_str().unwrap(), dest.to_str().unwrap()],
        );
        sh_git(&dest, &["config", "user.email", "test@example.com"]);
        sh_git(&dest, &["config", "user.name", "Test"]);

        (origin, seed, dest)
    }

    fn push_second_commit(seed: &Path) {
        fs::write(seed.join("b.txt"), "two").unwrap();
        sh_git(seed, &["add", "."]);
        sh_git(seed, &["commit", "-m", "two"]);
        sh_git(seed, &["push", "origin", "main"]);
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_update_pulls_new_commits() {
        let temp = TempDir::new().unwrap();
        let (_origin, seed, dest) = fixture(&temp);
        push_second_commit(&seed);

        let vcs = GitVcs::new(Arc::new(StubProvider));
        vcs.update_repo("acme/alpha", &dest).unwrap();

        assert!(dest.join("b.txt").exists());
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_update_stashes_and_restores_local_changes() {
        let temp = TempDir::new().unwrap();
        let (_origin, seed, dest) = fixture(&temp);
        push_second_commit(&seed);

        fs::write(dest.join("scratch.txt"), "uncommitted").unwrap();

        let vcs = GitVcs::new(Arc::new(StubProvider));
        vcs.update_repo("acme/alpha", &dest).unwrap();

        assert!(dest.join("b.txt").exists());
        assert_eq!(
            fs::read_to_string(dest.join("scratch.txt")).unwrap(),
            "uncommitted"
        );
    }

    #[test]
    #[cfg_attr(not(feature = "integration-tests"), ignore)]
    fn test_update_leaves_detached_head() {
        let temp = TempDir::new().unwrap();
        let (_origin, seed, dest) = fixture(&temp);
        sh_git(&dest, &["checkout", "--detach"]);
        push_second_commit(&seed);

        let vcs = GitVcs::new(Arc::new(StubProvider));
        vcs.update_repo("acme/alpha", &dest).unwrap();

        assert!(!is_detached(&dest));
        assert_eq!(current_branch(&dest).unwrap(), "main");
        assert!(dest.join("b.txt").exists());
    }
}
