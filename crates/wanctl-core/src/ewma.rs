//! Baseline/load RTT pair.
//!
//! Two exponentially weighted moving averages over the same probe stream:
//! a slow `baseline` that only advances when the sample looks like an idle
//! floor, and a fast `load` that tracks every sample unconditionally. The
//! gap between them (`delta`) is what the congestion FSM classifies.

/// Default gate: a sample more than this far above the current baseline is
/// assumed to be queueing, not a floor shift, and is excluded from the
/// baseline update.
pub const DEFAULT_BASELINE_UPDATE_THRESHOLD_MS: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct EwmaPair {
    baseline_rtt_ms: f64,
    load_rtt_ms: f64,
    alpha_baseline: f64,
    alpha_load: f64,
    baseline_update_threshold_ms: f64,
}

impl EwmaPair {
    /// Seed both estimators from the same cold-start value.
    pub fn seeded(
        baseline_rtt_initial: f64,
        alpha_baseline: f64,
        alpha_load: f64,
        baseline_update_threshold_ms: f64,
    ) -> Self {
        EwmaPair {
            baseline_rtt_ms: baseline_rtt_initial,
            load_rtt_ms: baseline_rtt_initial,
            alpha_baseline,
            alpha_load,
            baseline_update_threshold_ms,
        }
    }

    /// Restore from a persisted snapshot, falling back to the cold-start
    /// seed for whichever half is missing.
    pub fn from_snapshot(
        baseline_rtt_ms: Option<f64>,
        load_rtt_ms: Option<f64>,
        baseline_rtt_initial: f64,
        alpha_baseline: f64,
        alpha_load: f64,
        baseline_update_threshold_ms: f64,
    ) -> Self {
        EwmaPair {
            baseline_rtt_ms: baseline_rtt_ms.unwrap_or(baseline_rtt_initial),
            load_rtt_ms: load_rtt_ms.unwrap_or(baseline_rtt_initial),
            alpha_baseline,
            alpha_load,
            baseline_update_threshold_ms,
        }
    }

    pub fn baseline_rtt_ms(&self) -> f64 {
        self.baseline_rtt_ms
    }

    pub fn load_rtt_ms(&self) -> f64 {
        self.load_rtt_ms
    }

    pub fn delta_ms(&self) -> f64 {
        self.load_rtt_ms - self.baseline_rtt_ms
    }

    /// Always advances: `load <- (1-a)*load + a*sample`.
    pub fn update_load(&mut self, sample_ms: f64) {
        self.load_rtt_ms =
            (1.0 - self.alpha_load) * self.load_rtt_ms + self.alpha_load * sample_ms;
    }

    /// Advances only if the sample is within `baseline_update_threshold_ms`
    /// of the current baseline — an elevated, queued sample never drags the
    /// floor estimate upward.
    pub fn maybe_update_baseline(&mut self, sample_ms: f64) {
        if sample_ms - self.baseline_rtt_ms <= self.baseline_update_threshold_ms {
            self.baseline_rtt_ms =
                (1.0 - self.alpha_baseline) * self.baseline_rtt_ms + self.alpha_baseline * sample_ms;
        }
    }

    /// Scale an alpha tuned for a 50 ms tick to a different tick interval,
    /// preserving the EWMA's effective time constant.
    pub fn scale_alpha(alpha: f64, interval_ms: u64) -> f64 {
        (alpha * (interval_ms as f64 / 50.0)).clamp(0.0, 1.0)
    }
}
