//! Congestion classification: a pure function of `delta = load - baseline`.
//!
//! There is no "stuck" state held across ticks here — every tick reclassifies
//! from scratch. Hysteresis lives one layer up, in the rate controller's
//! streak counters.

use wanctl_common::config::{FsmKind, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CongestionState {
    Green,
    Yellow,
    SoftRed,
    Red,
}

impl CongestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionState::Green => "GREEN",
            CongestionState::Yellow => "YELLOW",
            CongestionState::SoftRed => "SOFT_RED",
            CongestionState::Red => "RED",
        }
    }
}

/// Classify `delta_ms` against the configured thresholds. 3-state configs
/// (no `hard_red_bloat_ms`) never produce `SoftRed`.
pub fn classify(delta_ms: f64, thresholds: &Thresholds, fsm_kind: FsmKind) -> CongestionState {
    let target = thresholds.target_bloat_ms;
    let warn = thresholds.warn_bloat_ms;

    match fsm_kind {
        FsmKind::FourState { .. } => {
            let hard = thresholds
                .hard_red_bloat_ms
                .expect("four-state config always carries hard_red_bloat_ms");
            if delta_ms <= target {
                CongestionState::Green
            } else if delta_ms <= warn {
                CongestionState::Yellow
            } else if delta_ms <= hard {
                CongestionState::SoftRed
            } else {
                CongestionState::Red
            }
        }
        FsmKind::ThreeState => {
            if delta_ms <= target {
                CongestionState::Green
            } else if delta_ms <= warn {
                CongestionState::Yellow
            } else {
                CongestionState::Red
            }
        }
    }
}
