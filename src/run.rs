//! # Run Orchestrator
//!
//! Drives one full reconciliation pass through its sequential phases:
//!
//! 1. load the grouping catalog (fatal if the document is missing);
//! 2. bulk-resolve the remote index and snapshot the local inventory;
//!    both single-threaded, read-only once the waves start;
//! 3. compute the diff plan;
//! 4. execute the clone wave, then the update wave, under the bounded pool;
//! 5. replay failures once, sequentially;
//! 6. prune local copies that are gone upstream;
//! 7. re-snapshot the inventory and print the report.
//!
//! Per-repository failures are reported, never fatal: the process exits
//! non-zero only when setup itself fails.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::catalog::{Catalog, Group};
use crate::cleaner::ReconciliationCleaner;
use crate::defaults;
use crate::error::{Error, Result};
use crate::inventory::LocalInventory;
use crate::output::{emoji, OutputConfig};
use crate::planner;
use crate::provider::{GhProvider, Provider};
use crate::remote_index::RemoteIndex;
use crate::report::{self, Reporter, RunStats};
use crate::retry::RetryCoordinator;
use crate::scheduler::TaskScheduler;
use crate::vcs::{GitVcs, Vcs};

/// Parameters of one reconciliation run.
pub struct RunOptions {
    /// Path to the grouping configuration document.
    pub config: PathBuf,
    /// Mirror root; group directories live under `<root>/repos`.
    pub root: PathBuf,
    /// Maximum concurrent workers per wave.
    pub jobs: usize,
    /// Optional fuzzy group selection; `None` reconciles every group.
    pub group: Option<String>,
    pub output: OutputConfig,
}

/// Run a full reconciliation with the default collaborators.
pub fn execute(opts: &RunOptions) -> Result<RunStats> {
    let provider: Arc<dyn Provider> = Arc::new(GhProvider::new());
    let vcs = GitVcs::new(provider.clone());
    execute_with(opts, provider, &vcs)
}

/// Run a full reconciliation with injected collaborators. This is the
/// entry point used by tests with deterministic doubles.
pub fn execute_with(
    opts: &RunOptions,
    provider: Arc<dyn Provider>,
    vcs: &dyn Vcs,
) -> Result<RunStats> {
    let reporter = Reporter::new(opts.output.clone());

    let catalog = Catalog::load(&opts.config)?;
    let selected = select_groups(&catalog, opts.group.as_deref())?;
    println!(
        "{} {} group(s), {} configured repositories",
        emoji(&opts.output, "📦", "[LOAD]"),
        selected.len(),
        selected.iter().map(|g| g.repos.len()).sum::<usize>()
    );

    let mut index = RemoteIndex::bulk_resolve(provider.clone(), defaults::REPO_LIST_CAP)?;
    debug!("remote index: {} entries for {}", index.len(), index.owner());

    let group_dirs: Vec<PathBuf> = selected.iter().map(|g| g.target_dir(&opts.root)).collect();
    let inventory = LocalInventory::scan(&group_dirs, &mut index);

    let mut plan = planner::compute(&selected, &opts.root, &mut index);
    reporter.print_plan(&plan);

    let scheduler = TaskScheduler::new(vcs, opts.jobs)?;
    let mut outcomes = scheduler.execute(std::mem::take(&mut plan.tasks));

    let recovered = RetryCoordinator::new(vcs).replay(&mut outcomes);
    if recovered > 0 {
        println!(
            "{} {} task(s) recovered on retry",
            emoji(&opts.output, "🔄", "[RETRY]"),
            recovered
        );
    }

    // Expected = configured ∩ resolved, for the selected groups.
    let expected: HashSet<String> = selected
        .iter()
        .flat_map(|g| g.repos.iter())
        .filter_map(|short| index.lookup(short).map(str::to_string))
        .collect();

    let cleaner = ReconciliationCleaner::new(&index, provider.as_ref());
    let cleanup = cleaner.clean(&inventory, &expected);

    // Fresh snapshot so repositories cloned this run are counted.
    let local_after = LocalInventory::scan(&group_dirs, &mut index);

    let stats = report::collect_stats(&plan, &outcomes, &cleanup);
    let ledger = report::failure_ledger(&outcomes, &cleanup);
    reporter.print_summary(&stats, &ledger);
    reporter.print_diff(&expected, &local_after);

    Ok(stats)
}

/// Resolve the optional group selection against the catalog.
fn select_groups(catalog: &Catalog, selection: Option<&str>) -> Result<Vec<Group>> {
    match selection {
        Some(name) => {
            let group = catalog
                .find_group_fuzzy(name)
                .ok_or_else(|| Error::GroupNotFound {
                    name: name.to_string(),
                    hint: Some(format!("Known groups: {}", catalog.group_names())),
                })?;
            Ok(vec![group.clone()])
        }
        None => Ok(catalog.groups().to_vec()),
    }
}
