//! # Run Statistics & Reporting
//!
//! Aggregates per-task outcomes, plan buckets and the cleanup sweep into
//! final counts, the failure ledger, and the expected-vs-local diff report
//! with its success rate.
//!
//! All aggregation happens single-threaded after execution: the inputs are
//! the isolated per-task outcome slots and the append-only ledger, so no
//! counter is ever touched concurrently.

use std::collections::HashSet;
use std::fmt;

use crate::cleaner::CleanupReport;
use crate::inventory::LocalInventory;
use crate::output::{emoji, OutputConfig};
use crate::planner::{DiffPlan, TaskKind};
use crate::scheduler::TaskOutcome;

/// Which operation a failure record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Clone,
    Update,
    Cleanup,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::Clone => write!(f, "clone"),
            FailureCategory::Update => write!(f, "update"),
            FailureCategory::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// One entry of the append-only failure ledger.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    /// Canonical identifier of the affected repository.
    pub id: String,
    pub category: FailureCategory,
    pub message: String,
}

/// Final counts for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cloned: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unresolvable: usize,
}

impl RunStats {
    /// Share of attempted tasks that succeeded, in percent. A run with no
    /// attempted tasks counts as fully successful.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.cloned + self.updated + self.failed;
        if attempted == 0 {
            100.0
        } else {
            (self.cloned + self.updated) as f64 * 100.0 / attempted as f64
        }
    }
}

/// Derive final counts from the plan, the (post-retry) outcomes and the
/// cleanup sweep.
pub fn collect_stats(
    plan: &DiffPlan,
    outcomes: &[TaskOutcome],
    cleanup: &CleanupReport,
) -> RunStats {
    let mut stats = RunStats {
        deleted: cleanup.deleted.len(),
        skipped: plan.skipped_count(),
        unresolvable: plan.unresolvable_count(),
        ..RunStats::default()
    };

    for outcome in outcomes {
        match (&outcome.result, outcome.task.kind) {
            (Ok(()), TaskKind::Clone) => stats.cloned += 1,
            (Ok(()), TaskKind::Update) => stats.updated += 1,
            (Err(_), _) => stats.failed += 1,
        }
    }

    stats
}

/// Assemble the failure ledger from task outcomes and cleanup failures.
pub fn failure_ledger(outcomes: &[TaskOutcome], cleanup: &CleanupReport) -> Vec<FailureRecord> {
    let mut ledger: Vec<FailureRecord> = outcomes
        .iter()
        .filter_map(|o| {
            o.result.as_ref().err().map(|message| FailureRecord {
                id: o.task.id.clone(),
                category: match o.task.kind {
                    TaskKind::Clone => FailureCategory::Clone,
                    TaskKind::Update => FailureCategory::Update,
                },
                message: message.clone(),
            })
        })
        .collect();
    ledger.extend(cleanup.failures.iter().cloned());
    ledger
}

/// Human-readable reporting to stdout.
pub struct Reporter {
    config: OutputConfig,
}

impl Reporter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Print the plan's bucket counts before execution starts.
    pub fn print_plan(&self, plan: &DiffPlan) {
        println!(
            "{} Plan: {} to clone, {} to update, {} skipped, {} unresolvable",
            emoji(&self.config, "📋", "[PLAN]"),
            plan.missing_count(),
            plan.to_update_count(),
            plan.skipped_count(),
            plan.unresolvable_count()
        );

        for group in &plan.groups {
            if !group.unresolvable.is_empty() {
                println!(
                    "{} {}: no remote repository found for {}",
                    emoji(&self.config, "⚠️ ", "[WARN]"),
                    group.group,
                    group.unresolvable.join(", ")
                );
            }
        }
    }

    /// Print final counts and the failure ledger.
    pub fn print_summary(&self, stats: &RunStats, ledger: &[FailureRecord]) {
        println!(
            "\n{} Done: {} added, {} updated, {} deleted, {} failed ({} skipped, {} unresolvable)",
            emoji(&self.config, "✅", "[DONE]"),
            stats.cloned,
            stats.updated,
            stats.deleted,
            stats.failed,
            stats.skipped,
            stats.unresolvable
        );
        println!("   Success rate: {:.1}%", stats.success_rate());

        if !ledger.is_empty() {
            println!("\n{} Failures:", emoji(&self.config, "❌", "[FAIL]"));
            for record in ledger {
                println!("   [{}] {}: {}", record.category, record.id, record.message);
            }
        }
    }

    /// Print the expected-vs-local diff from the post-execution snapshot.
    pub fn print_diff(&self, expected: &HashSet<String>, local: &LocalInventory) {
        println!(
            "\n{} Expected {} repositories, {} present locally",
            emoji(&self.config, "🔍", "[DIFF]"),
            expected.len(),
            local.len()
        );

        let mut missing: Vec<&String> = expected
            .iter()
            .filter(|id| !local.contains(id.as_str()))
            .collect();
        missing.sort();
        for id in missing {
            println!("   missing locally: {}", id);
        }

        let mut extra: Vec<&String> = local
            .ids()
            .iter()
            .filter(|id| !expected.contains(id.as_str()))
            .collect();
        extra.sort();
        for id in extra {
            println!("   present but not expected: {}", id);
        }
    }
}
