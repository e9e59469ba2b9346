//! # Retry Coordinator
//!
//! After both execution waves have drained, every clone/update failure is
//! replayed exactly once, sequentially. Transient network hiccups account
//! for most task failures, and a calm second attempt without pool
//! contention recovers many of them.
//!
//! A recovered task flips its outcome slot from failure to success, so the
//! counters derived from the outcomes afterwards net out to zero for a
//! fail-then-succeed task. The failure count shown to the user is only
//! final after this pass.

use log::info;

use crate::scheduler::{run_task, TaskOutcome};
use crate::vcs::Vcs;

pub struct RetryCoordinator<'a> {
    vcs: &'a dyn Vcs,
}

impl<'a> RetryCoordinator<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        Self { vcs }
    }

    /// Replay each failed outcome once. Returns the number of recoveries.
    pub fn replay(&self, outcomes: &mut [TaskOutcome]) -> usize {
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        if failed == 0 {
            return 0;
        }
        info!("retrying {} failed task(s)", failed);

        let mut recovered = 0;
        for outcome in outcomes.iter_mut().filter(|o| o.is_failure()) {
            outcome.task.attempts += 1;
            match run_task(self.vcs, &outcome.task) {
                Ok(()) => {
                    outcome.task.last_error = None;
                    outcome.result = Ok(());
                    recovered += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    outcome.task.last_error = Some(message.clone());
                    outcome.result = Err(message);
                }
            }
        }
        recovered
    }
}
