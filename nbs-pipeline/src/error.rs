//! Pipeline-level errors: socket setup and CLI validation failures that
//! sit outside `nbs_transport`'s own abstract error taxonomy.

use core::fmt;

/// Result type alias for pipeline operations.
pub type Result<T> = core::result::Result<T, PipelineError>;

/// Errors raised while standing up the daemon, before the reader/parser
/// threads are handed off to `nbs_transport`.
#[derive(Debug)]
pub enum PipelineError {
    /// The multicast group address or interface address failed to parse.
    BadAddress(String),
    /// Joining the multicast group, or binding the UDP socket, failed.
    Socket(std::io::Error),
    /// Installing the SIGHUP handler failed.
    Signal(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::BadAddress(s) => write!(f, "bad address: {s}"),
            PipelineError::Socket(e) => write!(f, "socket error: {e}"),
            PipelineError::Signal(e) => write!(f, "signal handler error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}
