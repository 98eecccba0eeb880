//! Per-WAN rate control, congestion classification, ICMP fallback, inter-WAN
//! steering, and the cycle scheduler that drives them all.
//!
//! This crate is transport-agnostic: every module here operates on plain
//! values (RTT samples, CAKE counters, config) and hands a
//! [`rate_controller::RateDecision`] or [`steering::SteeringAction`] back up
//! to the caller, which owns the actual [`wanctl_transport::RouterTransport`].

pub mod ewma;
pub mod fallback;
pub mod fsm;
pub mod prober;
pub mod rate_controller;
pub mod scheduler;
pub mod steering;

pub use ewma::EwmaPair;
pub use fallback::{FallbackAction, FallbackPolicy};
pub use fsm::{classify as classify_congestion, CongestionState};
pub use prober::{probe, ProbeResult};
pub use rate_controller::{floor_for_state, step as step_rate, DirectionState, RateDecision, StreakCounters};
pub use scheduler::CycleScheduler;
pub use steering::{SteeringAction, SteeringArbiter, SteeringState, SteeringTickOutcome};
