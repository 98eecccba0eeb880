use serde::Deserialize;

/// Counters read from one CAKE queue. Counters are
/// cumulative and never reset by the daemon; only the router resets them
/// (typically on reboot).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CakeStats {
    pub dropped_pkts: u64,
    pub queued_pkts: u64,
    pub bytes_in: u64,
    pub rtt_hint: Option<f64>,
}
