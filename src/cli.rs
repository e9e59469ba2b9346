//! CLI argument parsing for the single reconciliation run

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use repo_mirror::defaults;
use repo_mirror::output::OutputConfig;
use repo_mirror::run::{self, RunOptions};

/// Repository Mirror - keep a grouped local mirror of remote repositories
/// synchronized
#[derive(Parser, Debug)]
#[command(name = "repo-mirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the grouping configuration document.
    ///
    /// Defaults to `repos.md` under the mirror root.
    #[arg(short, long, value_name = "FILE", env = "REPO_MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Mirror root directory; group directories live under `<root>/repos`
    #[arg(long, value_name = "DIR", env = "REPO_MIRROR_ROOT")]
    root: Option<PathBuf>,

    /// Maximum concurrent workers per wave
    #[arg(short, long, value_name = "N", env = "REPO_MIRROR_JOBS", default_value_t = defaults::MAX_WORKERS)]
    jobs: usize,

    /// Only reconcile the group matching this name (exact, then first
    /// case-insensitive substring match)
    #[arg(short, long, value_name = "NAME")]
    group: Option<String>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Execute the reconciliation run.
    ///
    /// Individual repository failures are reported in the summary and do
    /// not affect the exit code; only setup failures bubble up as errors.
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.log_level),
        )
        .init();

        let output = OutputConfig::from_env_and_flag(&self.color);
        let root = self.root.unwrap_or_else(defaults::default_root);
        let config = self
            .config
            .unwrap_or_else(|| root.join(defaults::CONFIG_FILE));

        let opts = RunOptions {
            config,
            root,
            jobs: self.jobs,
            group: self.group,
            output,
        };

        run::execute(&opts)?;
        Ok(())
    }
}
