//! Inter-WAN steering arbiter.
//!
//! Runs once per tick alongside the primary WAN's rate loop. Takes an
//! (advisory, possibly slightly stale) RTT delta reading plus a fresh CAKE
//! stats read, smooths both independently of the rate loop's own EWMAs, and
//! decides whether the steering rule should be enabled or disabled.

use wanctl_common::config::SteeringConfig;
use wanctl_transport::CakeStats;

/// Queue occupancy (packets) at or below which the GREEN band's queue
/// condition is satisfied. Not separately configurable — only
/// `min_queue_red` is a tunable.
const QUEUE_GREEN_MAX: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringState {
    Good,
    Degraded,
}

impl SteeringState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SteeringState::Good => "SPECTRUM_GOOD",
            SteeringState::Degraded => "SPECTRUM_DEGRADED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    Green,
    Yellow,
    RedCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringAction {
    EnableRule,
    DisableRule,
}

#[derive(Debug, Clone, Copy)]
pub struct SteeringTickOutcome {
    pub state: SteeringState,
    pub bad_streak: u64,
    pub good_streak: u64,
    pub delta_rtt_ms: f64,
    pub drop_delta: u64,
    pub queue_depth_ewma: f64,
    /// `Some` exactly on the tick a transition actually occurs.
    pub action: Option<SteeringAction>,
}

pub struct SteeringArbiter {
    cfg: SteeringConfig,
    delta_ewma: f64,
    delta_initialized: bool,
    queue_ewma: f64,
    queue_initialized: bool,
    prev_dropped_pkts: Option<u64>,
    state: SteeringState,
    bad_streak: u64,
    good_streak: u64,
}

impl SteeringArbiter {
    pub fn new(cfg: SteeringConfig) -> Self {
        SteeringArbiter {
            cfg,
            delta_ewma: 0.0,
            delta_initialized: false,
            queue_ewma: 0.0,
            queue_initialized: false,
            prev_dropped_pkts: None,
            state: SteeringState::Good,
            bad_streak: 0,
            good_streak: 0,
        }
    }

    pub fn state(&self) -> SteeringState {
        self.state
    }

    /// Feed one tick's raw RTT delta (read, possibly stale, from the primary
    /// WAN's rate loop) and a fresh CAKE stats snapshot.
    pub fn observe_tick(&mut self, raw_delta_ms: f64, stats: CakeStats) -> SteeringTickOutcome {
        update_ewma(
            &mut self.delta_ewma,
            &mut self.delta_initialized,
            raw_delta_ms,
            self.cfg.alpha_rtt,
        );

        let drop_delta = compute_drop_delta(&mut self.prev_dropped_pkts, stats.dropped_pkts);

        update_ewma(
            &mut self.queue_ewma,
            &mut self.queue_initialized,
            stats.queued_pkts as f64,
            self.cfg.alpha_queue,
        );

        let observation = classify(self.delta_ewma, drop_delta, self.queue_ewma, &self.cfg);

        match observation {
            Observation::RedCandidate => {
                self.bad_streak += 1;
                self.good_streak = 0;
            }
            Observation::Green => {
                self.good_streak += 1;
                self.bad_streak = 0;
            }
            Observation::Yellow => {
                self.bad_streak = 0;
                self.good_streak = 0;
            }
        }

        let mut action = None;
        match self.state {
            SteeringState::Good if self.bad_streak >= self.cfg.bad_samples_required as u64 => {
                self.state = SteeringState::Degraded;
                action = Some(SteeringAction::EnableRule);
            }
            SteeringState::Degraded if self.good_streak >= self.cfg.good_samples_required as u64 => {
                self.state = SteeringState::Good;
                action = Some(SteeringAction::DisableRule);
            }
            _ => {}
        }

        SteeringTickOutcome {
            state: self.state,
            bad_streak: self.bad_streak,
            good_streak: self.good_streak,
            delta_rtt_ms: self.delta_ewma,
            drop_delta,
            queue_depth_ewma: self.queue_ewma,
            action,
        }
    }
}

fn classify(delta_ms: f64, drop_delta: u64, queue_ewma: f64, cfg: &SteeringConfig) -> Observation {
    let queue = queue_ewma.round() as u64;
    let is_red_candidate =
        delta_ms > cfg.red_rtt_ms && drop_delta >= cfg.min_drops_red && queue >= cfg.min_queue_red;
    if is_red_candidate {
        return Observation::RedCandidate;
    }
    let is_green = delta_ms < cfg.green_rtt_ms && drop_delta == 0 && queue <= QUEUE_GREEN_MAX;
    if is_green {
        Observation::Green
    } else {
        Observation::Yellow
    }
}

/// `current < previous` means the router-side counter reset (reboot or
/// wrap); treat that tick's delta as zero and rebase on the new value.
fn compute_drop_delta(prev: &mut Option<u64>, current: u64) -> u64 {
    let delta = match *prev {
        None => 0,
        Some(p) if current < p => 0,
        Some(p) => current - p,
    };
    *prev = Some(current);
    delta
}

fn update_ewma(value: &mut f64, initialized: &mut bool, sample: f64, alpha: f64) {
    if *initialized {
        *value = *value * (1.0 - alpha) + sample * alpha;
    } else {
        *value = sample;
        *initialized = true;
    }
}
