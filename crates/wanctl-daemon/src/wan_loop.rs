//! Drives one WAN's observe → estimate → classify → actuate cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;

use wanctl_common::config::{DirectionFloors, ValidatedWanConfig};
use wanctl_common::health::{HealthSnapshot, StreakCounters as HealthStreaks, WanHealth};
use wanctl_common::snapshot::{DirectionSnapshot, EwmaSnapshot, SnapshotRecord};
use wanctl_core::{
    classify_congestion, floor_for_state, probe, step_rate, CongestionState, CycleScheduler,
    DirectionState, EwmaPair, FallbackAction, FallbackPolicy, ProbeResult, RateDecision,
};
use wanctl_transport::{Direction, RouterTransport, TransportError};

/// Why a WAN loop stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Shutdown was requested and honored cleanly.
    Clean,
    /// The fallback policy's cycle budget was exhausted (exit code 3).
    FallbackGaveUp,
}

/// §7 is explicit that a transient transport error gets a single retry
/// within the current tick before deferring to the next; §4.4's "(50 ms,
/// 100 ms)" describes the two-step backoff schedule of a longer retry
/// policy it does not otherwise specify. This follows §7: one retry, 50 ms
/// backoff.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

pub fn run_wan_loop(
    cfg: &ValidatedWanConfig,
    transport: Arc<dyn RouterTransport>,
    shutdown: Arc<AtomicBool>,
    health: Arc<Mutex<HealthSnapshot>>,
    primary_delta_slot: Option<Arc<ArcSwap<f64>>>,
) -> LoopOutcome {
    let snapshot_path = SnapshotRecord::path_for(std::path::Path::new(&cfg.state_dir), &cfg.wan_name);
    let snapshot = SnapshotRecord::load_or_none(&snapshot_path);

    let mut ewma = match &snapshot {
        Some(s) => EwmaPair::from_snapshot(
            s.ewma.baseline_rtt_ms,
            s.ewma.load_rtt_ms,
            cfg.baseline_rtt_initial,
            cfg.thresholds.alpha_baseline,
            cfg.thresholds.alpha_load,
            cfg.thresholds.baseline_update_threshold_ms,
        ),
        None => EwmaPair::seeded(
            cfg.baseline_rtt_initial,
            cfg.thresholds.alpha_baseline,
            cfg.thresholds.alpha_load,
            cfg.thresholds.baseline_update_threshold_ms,
        ),
    };

    let mut download = DirectionState::startup(
        &cfg.download,
        snapshot.as_ref().and_then(|s| s.download.current_rate_mbps),
    );
    let mut upload = DirectionState::startup(
        &cfg.upload,
        snapshot.as_ref().and_then(|s| s.upload.current_rate_mbps),
    );
    if let Some(s) = &snapshot {
        restore_streaks(&mut download, &s.download);
        restore_streaks(&mut upload, &s.upload);
    }

    let mut fallback = FallbackPolicy::new(cfg.fallback.mode, cfg.fallback.max_fallback_cycles);
    let interval = Duration::from_millis(cfg.interval_ms);
    let scheduler = CycleScheduler::new(interval);

    let mut outcome = LoopOutcome::Clean;
    let mut last_persisted_rates = (download.current_rate_mbps, upload.current_rate_mbps);

    scheduler.run(&shutdown, |tick| {
        if !cfg.monitoring_enabled {
            return;
        }

        let probe_result = probe(
            transport.as_ref(),
            &cfg.ping_hosts,
            cfg.use_median_of_three,
            interval,
        );

        let action = match probe_result {
            ProbeResult::Success { rtt_ms } => fallback.on_probe_success(rtt_ms),
            ProbeResult::AllFailed => fallback.on_probe_failure(ewma.load_rtt_ms()),
        };

        let delta_ms = match action {
            FallbackAction::RunNormally { sample_ms } => {
                ewma.update_load(sample_ms);
                ewma.maybe_update_baseline(sample_ms);
                Some(ewma.delta_ms())
            }
            FallbackAction::UseLastRtt { sample_ms } => Some(sample_ms - ewma.baseline_rtt_ms()),
            FallbackAction::FreezeRates => None,
            FallbackAction::GiveUp => {
                outcome = LoopOutcome::FallbackGaveUp;
                shutdown.store(true, Ordering::SeqCst);
                None
            }
        };

        if let Some(delta_ms) = delta_ms {
            if let Some(slot) = &primary_delta_slot {
                slot.store(Arc::new(delta_ms));
            }

            let state = classify_congestion(delta_ms, &cfg.thresholds, cfg.fsm_kind);
            let download_decision = step_rate(&mut download, state, &cfg.download);
            let upload_decision = step_rate(&mut upload, state, &cfg.upload);

            push_rate_if_needed(
                transport.as_ref(),
                &cfg.download_queue,
                Direction::Download,
                &download_decision,
                &mut download,
                &cfg.download,
            );
            push_rate_if_needed(
                transport.as_ref(),
                &cfg.upload_queue,
                Direction::Upload,
                &upload_decision,
                &mut upload,
                &cfg.upload,
            );

            tracing::info!(
                wan = %cfg.wan_name,
                tick,
                download_state = state.as_str(),
                upload_state = state.as_str(),
                delta_ms,
                baseline_ms = ewma.baseline_rtt_ms(),
                load_ms = ewma.load_rtt_ms(),
                download_rate = download.current_rate_mbps,
                upload_rate = upload.current_rate_mbps,
                "wan cycle"
            );

            update_health(&health, cfg, tick, state, delta_ms, &ewma, &download, &upload);

            let current_rates = (download.current_rate_mbps, upload.current_rate_mbps);
            if current_rates != last_persisted_rates {
                persist(&snapshot_path, &ewma, &download, &upload);
                last_persisted_rates = current_rates;
            }
        }
    });

    persist(&snapshot_path, &ewma, &download, &upload);
    outcome
}

fn restore_streaks(dir: &mut DirectionState, snap: &DirectionSnapshot) {
    dir.streaks.green = snap.green_streak.unwrap_or(0);
    dir.streaks.yellow = snap.yellow_streak.unwrap_or(0);
    dir.streaks.soft_red = snap.soft_red_streak.unwrap_or(0);
    dir.streaks.red = snap.red_streak.unwrap_or(0);
}

/// Push `decision`'s rate to the router if it cleared the churn-suppression
/// threshold, retrying once on a retryable transport error with the
/// documented backoff before caching the desired value for next tick.
fn push_rate_if_needed(
    transport: &dyn RouterTransport,
    queue_name: &str,
    direction: Direction,
    decision: &RateDecision,
    dir: &mut DirectionState,
    floors: &DirectionFloors,
) {
    if !decision.should_push {
        return;
    }

    let mut attempt_result = transport.set_rate(queue_name, direction, decision.desired_rate_mbps);
    if let Err(e) = &attempt_result {
        if e.is_retryable() {
            std::thread::sleep(RETRY_BACKOFF);
            attempt_result = transport.set_rate(queue_name, direction, decision.desired_rate_mbps);
        }
    }

    match attempt_result {
        Ok(()) => dir.mark_applied(decision.desired_rate_mbps),
        Err(TransportError::RejectedValue { resource, message }) => {
            // No accepted range is derivable from a bare rejection message;
            // drop to this state's hard floor so the next tick retries from
            // a value the router is certain to accept.
            let floor = floor_for_state(decision.state, floors);
            tracing::error!(resource, message, floor_mbps = floor, "router rejected rate, dropping to state floor");
            dir.current_rate_mbps = floor;
        }
        Err(e) => {
            tracing::error!(queue_name, error = %e, desired = decision.desired_rate_mbps, "set_rate failed, will retry next tick");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn update_health(
    health: &Arc<Mutex<HealthSnapshot>>,
    cfg: &ValidatedWanConfig,
    tick: u64,
    state: CongestionState,
    delta_ms: f64,
    ewma: &EwmaPair,
    download: &DirectionState,
    upload: &DirectionState,
) {
    let entry = WanHealth {
        wan_name: cfg.wan_name.clone(),
        tick,
        download_state: state.as_str().to_string(),
        upload_state: state.as_str().to_string(),
        delta_rtt_ms: delta_ms,
        baseline_rtt_ms: ewma.baseline_rtt_ms(),
        load_rtt_ms: ewma.load_rtt_ms(),
        download_rate_mbps: download.current_rate_mbps,
        upload_rate_mbps: upload.current_rate_mbps,
        download_streaks: streak_snapshot(download),
        upload_streaks: streak_snapshot(upload),
        fallback_active: false,
        last_tick_skew_ms: None,
    };

    let mut guard = health.lock().unwrap_or_else(|e| e.into_inner());
    guard.wans.retain(|w| w.wan_name != entry.wan_name);
    guard.wans.push(entry);
}

fn streak_snapshot(dir: &DirectionState) -> HealthStreaks {
    HealthStreaks {
        green: dir.streaks.green,
        yellow: dir.streaks.yellow,
        soft_red: dir.streaks.soft_red,
        red: dir.streaks.red,
    }
}

fn persist(path: &std::path::Path, ewma: &EwmaPair, download: &DirectionState, upload: &DirectionState) {
    let record = SnapshotRecord {
        download: direction_snapshot(download),
        upload: direction_snapshot(upload),
        ewma: EwmaSnapshot {
            baseline_rtt_ms: Some(ewma.baseline_rtt_ms()),
            load_rtt_ms: Some(ewma.load_rtt_ms()),
        },
        timestamp_iso: Utc::now().to_rfc3339(),
    };
    if let Err(e) = record.save_atomic(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist state snapshot");
    }
}

fn direction_snapshot(dir: &DirectionState) -> DirectionSnapshot {
    DirectionSnapshot {
        green_streak: Some(dir.streaks.green),
        yellow_streak: Some(dir.streaks.yellow),
        soft_red_streak: Some(dir.streaks.soft_red),
        red_streak: Some(dir.streaks.red),
        current_rate_mbps: Some(dir.current_rate_mbps),
    }
}
