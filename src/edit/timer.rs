//! A fixed-interval repeating task driven by explicit clock ticks.
//!
//! The editor has no event loop of its own. Callers feed it `Instant`s
//! through [`RepeatingTask::due_ticks`], which keeps the task testable with
//! synthetic time.

use std::time::{Duration, Instant};

/// Default nudge repeat interval.
pub const DEFAULT_NUDGE_INTERVAL: Duration = Duration::from_millis(20);

/// Most repeats replayed by one [`RepeatingTask::due_ticks`] call after a
/// stall. The rest of the backlog is dropped.
pub const MAX_CATCH_UP_TICKS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatingTask {
    interval: Duration,
    next_due: Option<Instant>,
}

impl RepeatingTask {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Schedules the first repeat one interval after `now`.
    ///
    /// Starting an active task keeps its current schedule. An interval too
    /// large to schedule leaves the task inactive.
    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = now.checked_add(self.interval);
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Number of repeats that fell due up to `now`, advancing the schedule.
    ///
    /// At most [`MAX_CATCH_UP_TICKS`] are returned; after a longer stall
    /// the next repeat is scheduled one interval after `now`.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };
        if self.interval.is_zero() {
            self.next_due = Some(now);
            return u32::from(now >= due);
        }

        let mut ticks = 0;
        while due <= now && ticks < MAX_CATCH_UP_TICKS {
            ticks += 1;
            match due.checked_add(self.interval) {
                Some(next) => due = next,
                None => {
                    self.next_due = None;
                    return ticks;
                }
            }
        }
        self.next_due = if due <= now {
            now.checked_add(self.interval)
        } else {
            Some(due)
        };
        ticks
    }
}

impl Default for RepeatingTask {
    fn default() -> Self {
        Self::new(DEFAULT_NUDGE_INTERVAL)
    }
}
