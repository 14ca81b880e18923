//! Command-line surface. The core protocol stack in `nbs_transport` never
//! parses any of this; `main.rs` translates parsed [`Args`] into a
//! [`nbs_transport::QueueConfig`] and a [`crate::socket::MulticastSocket`].

use std::net::Ipv4Addr;

use clap::Parser;

/// NOAAPort Broadcast System receive daemon.
#[derive(Debug, Parser)]
#[command(name = "nbs-pipeline", version, about)]
pub struct Args {
    /// Feed-type filter, e.g. "NEXRAD" or "NWSTG"; purely advisory at
    /// this layer, logged but not enforced by the core stack.
    #[arg(long)]
    pub feed_type: Option<String>,

    /// IPv4 multicast group address to join.
    #[arg(long, default_value = "224.0.1.1")]
    pub mcast_group: Ipv4Addr,

    /// Local interface address to join the multicast group on.
    #[arg(long, default_value = "0.0.0.0")]
    pub mcast_iface: Ipv4Addr,

    /// Destination product-queue path; the core stack does not write to
    /// it directly, this is forwarded to the configured presentation
    /// sink.
    #[arg(long)]
    pub pq_path: Option<String>,

    /// Total byte capacity of the frame queue.
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub queue_bytes: usize,

    /// Maximum frame size the reader will buffer.
    #[arg(long, default_value_t = 65_507)]
    pub max_frame_bytes: usize,

    /// Increase log verbosity; may be repeated.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease log verbosity; may be repeated.
    #[arg(short = 'q', long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Args {
    /// Resolves verbosity flags into an `env_logger` filter string, used
    /// only when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        let level = i16::from(self.verbose) - i16::from(self.quiet);
        match level {
            i16::MIN..=-1 => "error",
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn queue_config(&self) -> nbs_transport::QueueConfig {
        nbs_transport::QueueConfig {
            queue_bytes: self.queue_bytes,
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_filter_matches_verbosity_balance() {
        let mut args = Args::parse_from(["nbs-pipeline"]);
        assert_eq!(args.default_log_filter(), "info");
        args.verbose = 2;
        assert_eq!(args.default_log_filter(), "trace");
        args.verbose = 0;
        args.quiet = 1;
        assert_eq!(args.default_log_filter(), "error");
    }

    #[test]
    fn parses_multicast_addresses() {
        let args = Args::parse_from([
            "nbs-pipeline",
            "--mcast-group",
            "224.0.1.2",
            "--mcast-iface",
            "192.168.1.10",
        ]);
        assert_eq!(args.mcast_group, Ipv4Addr::new(224, 0, 1, 2));
        assert_eq!(args.mcast_iface, Ipv4Addr::new(192, 168, 1, 10));
    }
}
