use std::time::Duration;

use crate::cake::CakeStats;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

/// One round of ICMP echoes issued by [`RouterTransport::ping`].
#[derive(Debug, Clone, Default)]
pub struct PingResult {
    /// RTT of every echo that returned, in milliseconds. Empty means every
    /// echo failed (`AllFailed`).
    pub samples_ms: Vec<f64>,
}

/// The router control-plane operations the daemon needs.
///
/// Every operation is atomic from the caller's point of view — a single
/// call either succeeds, fails with a [`TransportError::Retryable`] (safe to
/// retry in the same tick), or fails with a [`TransportError::Terminal`]
/// one (stop actuating, keep observing). Implementations must serialize
/// their own I/O: at most one operation may be in flight per endpoint at a
/// time.
pub trait RouterTransport: Send + Sync {
    /// Read CAKE counters and instantaneous queue occupancy for a queue.
    fn read_stats(&self, queue_name: &str) -> Result<CakeStats, TransportError>;

    /// Write the shaping rate ceiling for one direction of a queue.
    /// Idempotent: setting the same value twice is a no-op at the router.
    fn set_rate(&self, queue_name: &str, direction: Direction, mbps: f64)
        -> Result<(), TransportError>;

    /// Enable a preexisting policy-routing rule.
    fn enable_rule(&self, rule_id: &str) -> Result<(), TransportError>;

    /// Disable a preexisting policy-routing rule.
    fn disable_rule(&self, rule_id: &str) -> Result<(), TransportError>;

    /// Issue `count` ICMP echoes to `host`, each bounded by `deadline`.
    /// Default implementation uses the operating system directly via raw
    /// ICMP sockets rather than round-tripping through the router.
    fn ping(&self, host: &str, count: u32, deadline: Duration) -> Result<PingResult, TransportError> {
        crate::icmp::ping_host(host, count, deadline)
    }
}
