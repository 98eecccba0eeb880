//! Router transport abstraction for wanctl.
//!
//! One [`RouterTransport`] trait, two implementations ([`RestTransport`],
//! [`SshTransport`]), chosen once at startup from config. Both enforce at
//! most one outstanding command per endpoint.

pub mod cake;
pub mod error;
pub mod icmp;
pub mod rest;
pub mod router;
pub mod ssh;

pub use cake::CakeStats;
pub use error::TransportError;
pub use icmp::{ping_host, IcmpSocket};
pub use rest::RestTransport;
pub use router::{Direction, PingResult, RouterTransport};
pub use ssh::SshTransport;

use std::sync::Arc;

use wanctl_common::config::{RouterConfig, TransportKind};

/// Construct the configured transport behind a shared, thread-safe handle.
/// Every WAN's rate loop and the steering loop (when the WAN is primary)
/// share this one handle, so serialization happens at a single point.
pub fn build_transport(config: &RouterConfig) -> Arc<dyn RouterTransport> {
    match config.kind {
        TransportKind::Rest => Arc::new(RestTransport::new(config)),
        TransportKind::Ssh => Arc::new(SshTransport::new(config)),
    }
}
