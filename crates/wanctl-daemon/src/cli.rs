use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Adaptive bufferbloat controller for CAKE-shaped WAN links.
#[derive(Parser, Debug)]
#[command(name = "wanctl", about = "Per-WAN bufferbloat controller and inter-WAN steering daemon")]
pub struct Cli {
    /// Directory containing one YAML config file per WAN.
    #[arg(long)]
    pub config: PathBuf,

    /// Log level filter, e.g. info, debug, wanctl_core=trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Address the health JSON endpoint listens on.
    #[arg(long, default_value = "0.0.0.0:9411")]
    pub health_addr: SocketAddr,
}
