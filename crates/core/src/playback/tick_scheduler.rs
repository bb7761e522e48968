use std::time::{Duration, Instant};

/// Fixed-interval deadline scheduler for playback ticks.
///
/// Deadlines advance by whole intervals so the cadence does not drift with
/// the time spent handling each tick. If a caller falls more than one
/// interval behind, the schedule restarts from now instead of bursting.
#[derive(Clone, Debug)]
pub struct TickScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// First tick is due immediately at `now`.
    pub fn start_at(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.next_due, Some(due) if now >= due)
    }

    /// Consumes the current deadline if due and schedules the next one.
    pub fn fire(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let next = due + self.interval;
        self.next_due = Some(if next <= now { now + self.interval } else { next });
        true
    }

    /// Blocks until the next tick is due and consumes it.
    ///
    /// Returns `false` immediately when the scheduler is stopped.
    pub fn wait(&mut self) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        self.fire(Instant::now().max(due))
    }
}
