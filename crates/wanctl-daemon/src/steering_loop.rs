//! Drives the inter-WAN steering arbiter against the primary WAN.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;

use wanctl_common::config::{SteeringConfig, ValidatedWanConfig};
use wanctl_common::health::{HealthSnapshot, SteeringHealth};
use wanctl_core::{CycleScheduler, SteeringAction, SteeringArbiter};
use wanctl_transport::RouterTransport;

pub fn run_steering_loop(
    cfg: &ValidatedWanConfig,
    steering_cfg: SteeringConfig,
    transport: Arc<dyn RouterTransport>,
    shutdown: Arc<AtomicBool>,
    delta_slot: Arc<ArcSwap<f64>>,
    health: Arc<Mutex<HealthSnapshot>>,
) {
    let rule_id = steering_cfg.rule_id.clone();
    let mut arbiter = SteeringArbiter::new(steering_cfg);
    let interval = Duration::from_millis(cfg.interval_ms);
    let scheduler = CycleScheduler::new(interval);

    scheduler.run(&shutdown, |tick| {
        let delta_ms = **delta_slot.load();

        let stats = match transport.read_stats(&cfg.download_queue) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(wan = %cfg.wan_name, error = %e, "steering loop could not read CAKE stats this tick");
                return;
            }
        };

        let outcome = arbiter.observe_tick(delta_ms, stats);

        if let Some(action) = outcome.action {
            let result = match action {
                SteeringAction::EnableRule => transport.enable_rule(&rule_id),
                SteeringAction::DisableRule => transport.disable_rule(&rule_id),
            };
            match result {
                Ok(()) => tracing::info!(rule_id, state = outcome.state.as_str(), "steering rule toggled"),
                Err(e) => tracing::error!(rule_id, error = %e, "failed to toggle steering rule"),
            }
        }

        tracing::info!(
            tick,
            state = outcome.state.as_str(),
            bad_streak = outcome.bad_streak,
            good_streak = outcome.good_streak,
            delta_rtt_ms = outcome.delta_rtt_ms,
            drop_delta = outcome.drop_delta,
            "steering cycle"
        );

        let mut guard = health.lock().unwrap_or_else(|e| e.into_inner());
        guard.steering = Some(SteeringHealth {
            tick,
            state: outcome.state.as_str().to_string(),
            bad_streak: outcome.bad_streak,
            good_streak: outcome.good_streak,
            delta_rtt_ms: outcome.delta_rtt_ms,
            drop_delta: outcome.drop_delta,
            queue_depth_ewma: outcome.queue_depth_ewma,
        });
    });
}
