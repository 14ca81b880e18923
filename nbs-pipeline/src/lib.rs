//! The NBS receive daemon: CLI parsing, the multicast byte source, and
//! the two-thread reader/parser pipeline wired around
//! `nbs_transport::FrameQueue`.

pub mod cli;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod socket;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutcome};
