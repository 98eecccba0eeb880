mod cli;
mod config_dir;
mod health_server;
mod steering_loop;
mod wan_loop;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use clap::Parser;

use wanctl_common::health::HealthSnapshot;
use wanctl_transport::build_transport;

use cli::Cli;
use wan_loop::LoopOutcome;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let configs = match config_dir::load_wan_configs(&cli.config) {
        Ok(configs) => configs,
        Err(e) => {
            tracing::error!(error = %e, "config load failed");
            std::process::exit(1);
        }
    };

    let transports: Vec<_> = configs
        .iter()
        .map(|cfg| (cfg.clone(), build_transport(&cfg.router)))
        .collect();

    for (cfg, transport) in &transports {
        if let Err(e) = transport.read_stats(&cfg.download_queue) {
            tracing::error!(wan = %cfg.wan_name, error = %e, "router unreachable at startup");
            std::process::exit(2);
        }
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handler(Arc::clone(&shutdown));

    let health = Arc::new(Mutex::new(HealthSnapshot::default()));
    let outcomes: Arc<Mutex<Vec<LoopOutcome>>> = Arc::new(Mutex::new(Vec::new()));

    let primary_delta_slot: Option<Arc<ArcSwap<f64>>> = if transports.iter().any(|(cfg, _)| cfg.primary) {
        Some(Arc::new(ArcSwap::new(Arc::new(0.0))))
    } else {
        None
    };

    let mut handles = Vec::new();

    for (cfg, transport) in transports.iter().cloned() {
        let shutdown = Arc::clone(&shutdown);
        let health = Arc::clone(&health);
        let outcomes = Arc::clone(&outcomes);
        let slot = if cfg.primary { primary_delta_slot.clone() } else { None };

        let handle = std::thread::Builder::new()
            .name(format!("wan-{}", cfg.wan_name))
            .spawn(move || {
                let outcome = wan_loop::run_wan_loop(&cfg, transport, shutdown, health, slot);
                outcomes.lock().unwrap_or_else(|e| e.into_inner()).push(outcome);
            })
            .expect("failed to spawn WAN loop thread");
        handles.push(handle);
    }

    if let Some(slot) = primary_delta_slot.clone() {
        if let Some((cfg, transport)) = transports
            .iter()
            .find(|(cfg, _)| cfg.primary && cfg.steering.is_some())
            .cloned()
        {
            let steering_cfg = cfg.steering.clone().expect("checked above");
            let shutdown = Arc::clone(&shutdown);
            let health = Arc::clone(&health);
            let handle = std::thread::Builder::new()
                .name("steering".to_string())
                .spawn(move || {
                    steering_loop::run_steering_loop(&cfg, steering_cfg, transport, shutdown, slot, health);
                })
                .expect("failed to spawn steering loop thread");
            handles.push(handle);
        }
    }

    {
        let health = Arc::clone(&health);
        let shutdown = Arc::clone(&shutdown);
        let addr = cli.health_addr;
        let handle = std::thread::Builder::new()
            .name("health".to_string())
            .spawn(move || health_server::run_health_server(addr, health, shutdown))
            .expect("failed to spawn health endpoint thread");
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }

    let outcomes = outcomes.lock().unwrap_or_else(|e| e.into_inner());
    let code = if outcomes.iter().any(|o| *o == LoopOutcome::FallbackGaveUp) {
        3
    } else {
        0
    };
    std::process::exit(code);
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}

/// Registers a Ctrl-C handler for graceful shutdown. A second signal
/// delivered within 5 seconds of the first forces an immediate exit
/// rather than waiting for the loops to notice the shutdown flag.
fn install_signal_handler(shutdown: Arc<AtomicBool>) {
    let first_signal: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    ctrlc::set_handler(move || {
        let mut guard = first_signal.lock().unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(at) if at.elapsed() < Duration::from_secs(5) => {
                tracing::warn!("second shutdown signal received, forcing immediate exit");
                std::process::exit(130);
            }
            _ => {
                tracing::info!("shutdown signal received, finishing in-flight cycles");
                shutdown.store(true, Ordering::SeqCst);
                *guard = Some(Instant::now());
            }
        }
    })
    .expect("failed to install signal handler");
}
