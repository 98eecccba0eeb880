//! ICMP fallback policy: what to do with a tick's rate computation when
//! every reflector probe fails.

use wanctl_common::config::FallbackMode;

/// What the WAN loop should do with this tick, decided by the fallback
/// policy from the probe outcome and the configured mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallbackAction {
    /// Probe succeeded (or fallback is disabled): run estimators, FSM, and
    /// rate controller against `sample_ms` as usual.
    RunNormally { sample_ms: f64 },
    /// Probe failed but the mode substitutes a synthetic sample: run the
    /// FSM and rate controller against `sample_ms`, but do NOT update
    /// either EWMA (baseline or load) with it.
    UseLastRtt { sample_ms: f64 },
    /// Skip the rate update entirely this tick. Not an error — the
    /// scheduler should treat this tick as a normal success.
    FreezeRates,
    /// Fallback budget exhausted: the daemon should surface this as a
    /// failure (exit code 3) for a supervisor to restart against.
    GiveUp,
}

/// Per-WAN fallback state. `consecutive_failures` counts the current run of
/// `AllFailed` probes; it resets to zero (with one log line) on the first
/// subsequent success.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    mode: FallbackMode,
    max_fallback_cycles: u32,
    consecutive_failures: u32,
}

impl FallbackPolicy {
    pub fn new(mode: FallbackMode, max_fallback_cycles: u32) -> Self {
        FallbackPolicy {
            mode,
            max_fallback_cycles,
            consecutive_failures: 0,
        }
    }

    /// Record a successful probe. Logs "ICMP recovered after N cycles" if
    /// this follows one or more failures.
    pub fn on_probe_success(&mut self, sample_ms: f64) -> FallbackAction {
        if self.consecutive_failures > 0 {
            tracing::info!(
                cycles = self.consecutive_failures,
                "ICMP recovered after {} cycle(s)",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
        }
        FallbackAction::RunNormally { sample_ms }
    }

    /// Record an `AllFailed` probe. `last_load_rtt_ms` is the most recent
    /// load-RTT EWMA value, used as the synthetic sample when the mode
    /// calls for it.
    pub fn on_probe_failure(&mut self, last_load_rtt_ms: f64) -> FallbackAction {
        self.consecutive_failures += 1;
        let cycle = self.consecutive_failures;

        match self.mode {
            FallbackMode::Freeze => {
                tracing::warn!(cycle, "ICMP probe failed, freezing rates (freeze mode)");
                FallbackAction::FreezeRates
            }
            FallbackMode::UseLastRtt => {
                tracing::warn!(cycle, rtt_ms = last_load_rtt_ms, "ICMP probe failed, using last RTT");
                FallbackAction::UseLastRtt {
                    sample_ms: last_load_rtt_ms,
                }
            }
            FallbackMode::GracefulDegradation => {
                if cycle == 1 {
                    tracing::warn!(
                        cycle,
                        max = self.max_fallback_cycles,
                        "ICMP probe failed, using last RTT, cycle {}/{}",
                        cycle,
                        self.max_fallback_cycles
                    );
                    FallbackAction::UseLastRtt {
                        sample_ms: last_load_rtt_ms,
                    }
                } else if cycle <= self.max_fallback_cycles {
                    tracing::warn!(
                        cycle,
                        max = self.max_fallback_cycles,
                        "ICMP probe failed, freezing rates, cycle {}/{}",
                        cycle,
                        self.max_fallback_cycles
                    );
                    FallbackAction::FreezeRates
                } else {
                    tracing::error!(
                        cycle,
                        max = self.max_fallback_cycles,
                        "ICMP probe failed beyond fallback budget, giving up"
                    );
                    FallbackAction::GiveUp
                }
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_mode_always_freezes() {
        let mut policy = FallbackPolicy::new(FallbackMode::Freeze, 3);
        for _ in 0..10 {
            assert_eq!(policy.on_probe_failure(25.0), FallbackAction::FreezeRates);
        }
    }

    #[test]
    fn use_last_rtt_mode_always_substitutes() {
        let mut policy = FallbackPolicy::new(FallbackMode::UseLastRtt, 3);
        for _ in 0..10 {
            assert_eq!(
                policy.on_probe_failure(26.5),
                FallbackAction::UseLastRtt { sample_ms: 26.5 }
            );
        }
    }

    #[test]
    fn graceful_degradation_cycle_1_uses_last_rtt() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        assert_eq!(
            policy.on_probe_failure(26.5),
            FallbackAction::UseLastRtt { sample_ms: 26.5 }
        );
    }

    #[test]
    fn graceful_degradation_cycles_2_through_n_freeze() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        policy.on_probe_failure(26.5); // cycle 1
        assert_eq!(policy.on_probe_failure(26.5), FallbackAction::FreezeRates); // cycle 2
        assert_eq!(policy.on_probe_failure(26.5), FallbackAction::FreezeRates); // cycle 3
    }

    #[test]
    fn graceful_degradation_gives_up_on_n_plus_1() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        policy.on_probe_failure(26.5); // 1
        policy.on_probe_failure(26.5); // 2
        policy.on_probe_failure(26.5); // 3
        assert_eq!(policy.on_probe_failure(26.5), FallbackAction::GiveUp); // 4
    }

    #[test]
    fn give_up_boundary_is_exact() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        for expected_cycle in 1..=3u32 {
            let action = policy.on_probe_failure(26.5);
            assert_ne!(action, FallbackAction::GiveUp, "should not give up on cycle {expected_cycle}");
        }
        assert_eq!(policy.on_probe_failure(26.5), FallbackAction::GiveUp);
    }

    #[test]
    fn success_resets_counter_and_logs_recovery() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        policy.on_probe_failure(26.5);
        policy.on_probe_failure(26.5);
        assert_eq!(policy.consecutive_failures(), 2);
        let action = policy.on_probe_success(25.2);
        assert_eq!(action, FallbackAction::RunNormally { sample_ms: 25.2 });
        assert_eq!(policy.consecutive_failures(), 0);
    }

    #[test]
    fn success_with_no_prior_failures_is_a_no_op_reset() {
        let mut policy = FallbackPolicy::new(FallbackMode::GracefulDegradation, 3);
        policy.on_probe_success(25.0);
        assert_eq!(policy.consecutive_failures(), 0);
    }
}
