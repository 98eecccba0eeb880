//! Read-only health snapshot shape served by the daemon's health endpoint.
//! Written once per tick by each loop into a shared slot; read-only and
//! never mutated by readers.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WanHealth {
    pub wan_name: String,
    pub tick: u64,
    pub download_state: String,
    pub upload_state: String,
    pub delta_rtt_ms: f64,
    pub baseline_rtt_ms: f64,
    pub load_rtt_ms: f64,
    pub download_rate_mbps: f64,
    pub upload_rate_mbps: f64,
    pub download_streaks: StreakCounters,
    pub upload_streaks: StreakCounters,
    pub fallback_active: bool,
    pub last_tick_skew_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StreakCounters {
    pub green: u64,
    pub yellow: u64,
    pub soft_red: u64,
    pub red: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SteeringHealth {
    pub tick: u64,
    pub state: String,
    pub bad_streak: u64,
    pub good_streak: u64,
    pub delta_rtt_ms: f64,
    pub drop_delta: u64,
    pub queue_depth_ewma: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSnapshot {
    pub wans: Vec<WanHealth>,
    pub steering: Option<SteeringHealth>,
}
