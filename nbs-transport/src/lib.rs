//! Core protocol library for the NOAAPort Broadcast System (NBS) receive
//! pipeline: frame decode, the resynchronizing frame reader, the bounded
//! SPSC frame queue, and the transport/reassembly layer that dispatches
//! reassembled product blocks to a presentation sink.
//!
//! No I/O beyond the [`io::Read`] seam and no threads of its own — the
//! `nbs-pipeline` crate owns the reader and parser threads and the
//! socket; this crate owns the protocol.

pub mod checksum;
pub mod error;
pub mod frame;
pub mod header;
pub mod io;
pub mod queue;
pub mod reader;
pub mod reassembly;
pub mod sink;
pub mod transport;

pub use error::{Error, Result};
pub use frame::DecodedFrame;
pub use header::{FrameHeader, ProdType, ProductDefinitionHeader, ProductSpecificHeader, TransType};
pub use queue::{FrameQueue, QueueStats};
pub use reader::FrameReader;
pub use reassembly::{Disposition, ReassemblyState};
pub use sink::PresentationSink;
pub use transport::TransportLayer;

/// Runtime configuration for the frame reader and frame queue, gathered
/// in one place so `nbs-pipeline` can build both from a single parsed
/// CLI surface.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Total byte capacity of the frame queue's ring.
    pub queue_bytes: usize,
    /// Maximum frame size the reader will buffer, excluding the Frame
    /// Header itself.
    pub max_frame_bytes: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_bytes: 10 * 1024 * 1024,
            max_frame_bytes: 65_507,
        }
    }
}
