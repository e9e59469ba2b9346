//! # Two-Wave Task Scheduler
//!
//! Executes the reconciliation plan's task list as two sequential waves,
//! clones first and then updates, each on a dedicated bounded worker pool.
//!
//! The pool is a `rayon::ThreadPool` built with exactly the configured
//! number of threads, so the number of simultaneously live workers can
//! never exceed the bound. Each worker performs exactly one task through
//! the injected [`Vcs`] collaborator and produces its own [`TaskOutcome`]
//! slot; outcomes are collected by a single aggregator after the wave
//! drains, so no shared mutable counters are touched from worker threads.
//!
//! `pool.install` returns only when every task of the wave has finished,
//! which is the barrier: no update may start before every clone of the run
//! has completed. Completeness is restored before bandwidth is spent on
//! freshness.

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::planner::{Priority, SyncTask, TaskKind};
use crate::vcs::Vcs;

/// The isolated, per-task result slot.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: SyncTask,
    /// `Err` carries the failure message for the ledger.
    pub result: std::result::Result<(), String>,
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Run a single task against the collaborator.
pub fn run_task(vcs: &dyn Vcs, task: &SyncTask) -> Result<()> {
    match task.kind {
        TaskKind::Clone => vcs.clone_repo(&task.id, &task.dest),
        TaskKind::Update => vcs.update_repo(&task.id, &task.dest),
    }
}

/// Bounded-concurrency executor for the planned task list.
pub struct TaskScheduler<'a> {
    vcs: &'a dyn Vcs,
    pool: rayon::ThreadPool,
}

impl<'a> TaskScheduler<'a> {
    /// Build a scheduler with at most `jobs` concurrent workers per wave.
    pub fn new(vcs: &'a dyn Vcs, jobs: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
            .map_err(|e| Error::WorkerPool {
                message: e.to_string(),
            })?;
        Ok(Self { vcs, pool })
    }

    /// Execute the flattened task list: the clone wave fully drains before
    /// the update wave is admitted.
    pub fn execute(&self, tasks: Vec<SyncTask>) -> Vec<TaskOutcome> {
        let (clones, updates): (Vec<_>, Vec<_>) = tasks
            .into_iter()
            .partition(|t| t.priority == Priority::High);

        let mut outcomes = self.run_wave("clone", clones);
        outcomes.extend(self.run_wave("update", updates));
        outcomes
    }

    fn run_wave(&self, label: &str, tasks: Vec<SyncTask>) -> Vec<TaskOutcome> {
        if tasks.is_empty() {
            return Vec::new();
        }
        info!("{} wave: {} task(s)", label, tasks.len());

        let bar = ProgressBar::new(tasks.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{prefix:>8} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(label.to_string());

        let outcomes: Vec<TaskOutcome> = self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|mut task| {
                    task.attempts += 1;
                    let result = run_task(self.vcs, &task);
                    bar.set_message(task.short.clone());
                    bar.inc(1);
                    match result {
                        Ok(()) => TaskOutcome {
                            task,
                            result: Ok(()),
                        },
                        Err(e) => {
                            let message = e.to_string();
                            task.last_error = Some(message.clone());
                            TaskOutcome {
                                task,
                                result: Err(message),
                            }
                        }
                    }
                })
                .collect()
        });

        bar.finish_and_clear();
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Mock collaborator recording start/end events and worker liveness.
    struct MockVcs {
        fail_ids: HashSet<String>,
        delay: Duration,
        live: AtomicUsize,
        max_live: AtomicUsize,
        events: Mutex<Vec<(&'static str, TaskKind, String)>>,
    }

    impl MockVcs {
        fn new(fail_ids: &[&str], delay_ms: u64) -> Self {
            Self {
                fail_ids: fail_ids.iter().map(|s| s.to_string()).collect(),
                delay: Duration::from_millis(delay_ms),
                live: AtomicUsize::new(0),
                max_live: AtomicUsize::new(0),
                events: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, kind: TaskKind, id: &str) -> Result<()> {
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(live, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(("start", kind, id.to_string()));

            thread::sleep(self.delay);

            self.events
                .lock()
                .unwrap()
                .push(("end", kind, id.to_string()));
            self.live.fetch_sub(1, Ordering::SeqCst);

            if self.fail_ids.contains(id) {
                Err(Error::Git {
                    command: "git".to_string(),
                    dir: id.to_string(),
                    stderr: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl Vcs for MockVcs {
        fn clone_repo(&self, id: &str, _dest: &Path) -> Result<()> {
            self.record(TaskKind::Clone, id)
        }
        fn update_repo(&self, id: &str, _dest: &Path) -> Result<()> {
            self.record(TaskKind::Update, id)
        }
    }

    fn task(id: &str, kind: TaskKind) -> SyncTask {
        let priority = match kind {
            TaskKind::Clone => Priority::High,
            TaskKind::Update => Priority::Low,
        };
        SyncTask {
            id: id.to_string(),
            short: id.rsplit('/').next().unwrap().to_string(),
            dest: PathBuf::from("/nonexistent").join(id),
            kind,
            priority,
            attempts: 0,
            last_error: None,
        }
    }

    fn mixed_tasks(clones: usize, updates: usize) -> Vec<SyncTask> {
        let mut tasks: Vec<SyncTask> = (0..clones)
            .map(|i| task(&format!("acme/clone{}", i), TaskKind::Clone))
            .collect();
        tasks.extend((0..updates).map(|i| task(&format!("acme/update{}", i), TaskKind::Update)));
        tasks
    }

    #[test]
    fn test_empty_plan_yields_no_outcomes() {
        let vcs = MockVcs::new(&[], 0);
        let scheduler = TaskScheduler::new(&vcs, 4).unwrap();
        assert!(scheduler.execute(Vec::new()).is_empty());
    }

    #[test]
    fn test_no_update_starts_before_every_clone_finishes() {
        let vcs = MockVcs::new(&[], 5);
        let scheduler = TaskScheduler::new(&vcs, 3).unwrap();
        scheduler.execute(mixed_tasks(6, 6));

        let events = vcs.events.lock().unwrap();
        let last_clone_end = events
            .iter()
            .rposition(|(phase, kind, _)| *phase == "end" && *kind == TaskKind::Clone)
            .unwrap();
        let first_update_start = events
            .iter()
            .position(|(phase, kind, _)| *phase == "start" && *kind == TaskKind::Update)
            .unwrap();

        assert!(
            last_clone_end < first_update_start,
            "update started at event {} before clone wave drained at {}",
            first_update_start,
            last_clone_end
        );
    }

    #[test]
    fn test_live_workers_never_exceed_bound() {
        let vcs = MockVcs::new(&[], 5);
        let scheduler = TaskScheduler::new(&vcs, 4).unwrap();
        scheduler.execute(mixed_tasks(12, 12));

        assert!(vcs.max_live.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn test_outcomes_carry_failures_and_attempts() {
        let vcs = MockVcs::new(&["acme/clone1"], 0);
        let scheduler = TaskScheduler::new(&vcs, 2).unwrap();
        let outcomes = scheduler.execute(mixed_tasks(3, 2));

        assert_eq!(outcomes.len(), 5);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failure()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task.id, "acme/clone1");
        assert!(failed[0].task.last_error.as_ref().unwrap().contains("boom"));
        assert!(outcomes.iter().all(|o| o.task.attempts == 1));
    }

    #[test]
    fn test_single_worker_still_drains_everything() {
        let vcs = MockVcs::new(&[], 1);
        let scheduler = TaskScheduler::new(&vcs, 1).unwrap();
        let outcomes = scheduler.execute(mixed_tasks(4, 4));

        assert_eq!(outcomes.len(), 8);
        assert_eq!(vcs.max_live.load(Ordering::SeqCst), 1);
    }
}
