//! Fixed-interval cycle scheduler shared by every WAN rate loop and the
//! steering loop.
//!
//! Ticks never accumulate: if a cycle's work overruns the interval, the next
//! deadline still advances from the *previous scheduled* start, not from
//! "now" — a slow cycle eats into catch-up on the next tick rather than
//! compounding, and a persistently slow body simply runs back-to-back with
//! no sleep rather than skipping ticks to resynchronize.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cycle's wall-clock cost above `interval * (1 + SKEW_WARN_FRACTION)` is
/// logged as skew. Informational only — it never changes scheduling
/// behavior. Probe waits alone can consume most of one interval, so the
/// budget is interval-plus-20%, not 20% of the interval.
const SKEW_WARN_FRACTION: f64 = 0.20;

pub struct CycleScheduler {
    interval: Duration,
    next_deadline: Instant,
}

impl CycleScheduler {
    pub fn new(interval: Duration) -> Self {
        CycleScheduler {
            interval,
            next_deadline: Instant::now() + interval,
        }
    }

    /// Run `body` once per tick until `shutdown` is set, sleeping between
    /// ticks to hold the configured cadence. `body` receives the scheduled
    /// tick's ordinal, starting at zero.
    pub fn run(mut self, shutdown: &Arc<AtomicBool>, mut body: impl FnMut(u64)) {
        let mut tick: u64 = 0;
        while !shutdown.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            body(tick);
            tick += 1;

            let work_elapsed = tick_start.elapsed();
            let skew_budget = self.interval + self.interval.mul_f64(SKEW_WARN_FRACTION);
            if work_elapsed > skew_budget {
                tracing::warn!(
                    tick,
                    work_ms = work_elapsed.as_secs_f64() * 1000.0,
                    interval_ms = self.interval.as_secs_f64() * 1000.0,
                    "cycle work exceeded skew budget"
                );
            }

            let now = Instant::now();
            if now < self.next_deadline {
                std::thread::sleep(self.next_deadline - now);
            }
            self.next_deadline += self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn runs_until_shutdown_flag_is_set() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let scheduler = CycleScheduler::new(Duration::from_millis(1));
        let count = AtomicU64::new(0);
        let shutdown_inner = shutdown.clone();
        scheduler.run(&shutdown, |tick| {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            if tick >= 4 {
                shutdown_inner.store(true, Ordering::SeqCst);
            }
        });
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn does_not_run_at_all_if_shutdown_already_set() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let scheduler = CycleScheduler::new(Duration::from_millis(1));
        let mut ran = false;
        scheduler.run(&shutdown, |_| ran = true);
        assert!(!ran);
    }

    #[test]
    fn deadline_advances_from_schedule_not_from_completion() {
        let interval = Duration::from_millis(5);
        let scheduler = CycleScheduler::new(interval);
        let first_deadline = scheduler.next_deadline;
        // A slow tick (simulated by sleeping past the interval inside body)
        // should not push the deadline further than one interval forward.
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_inner = shutdown.clone();
        let mut ticks = 0;
        scheduler.run(&shutdown, |_| {
            std::thread::sleep(Duration::from_millis(12));
            ticks += 1;
            if ticks >= 1 {
                shutdown_inner.store(true, Ordering::SeqCst);
            }
        });
        assert_eq!(ticks, 1);
        assert!(first_deadline.elapsed() >= Duration::from_millis(0));
    }
}
