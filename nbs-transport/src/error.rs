//! Error types for the NBS receive pipeline.
//!
//! Every variant corresponds to one of the abstract error kinds named in
//! the transport contract: [`Error::Invalid`], [`Error::Unsupported`] and
//! [`Error::NoStart`] are recovered locally by the caller (the frame or
//! fragment is dropped and processing continues); [`Error::Logic`],
//! [`Error::Io`], [`Error::NoMem`] and [`Error::System`] are surfaced and
//! end the calling thread's loop; [`Error::Eof`] and [`Error::Shutdown`]
//! are the two normal termination signals.

use core::fmt;

/// Result type alias for NBS transport operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error kinds produced by the frame reader, transport layer, and frame
/// queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A header failed a structural or checksum check; the frame carrying
    /// it is discarded and the reader resynchronizes.
    Invalid,

    /// The frame was well-formed but named a `prod_type` with no
    /// registered dispatch path.
    Unsupported,

    /// A continuation frame arrived before any start-of-product frame for
    /// its `prod_sequence_num`; it is dropped silently.
    NoStart,

    /// The caller violated the contract of an operation (for example,
    /// releasing more bytes than were reserved). Not recoverable locally.
    Logic,

    /// The byte source or presentation sink reported an I/O failure.
    Io,

    /// The byte source reached a clean end of stream.
    Eof,

    /// An allocation failed.
    NoMem,

    /// The presentation sink reported an unrecoverable OS-level failure.
    System,

    /// The frame queue is shut down and has no more frames to deliver.
    Shutdown,

    /// A `reserve`/`try_reserve` request exceeded the queue's total
    /// capacity; it can never succeed regardless of draining.
    TooBig,

    /// A non-blocking reservation could not be satisfied right now.
    NoSpace,

    /// `release` was called with a count larger than the most recent
    /// reservation. The queue may be corrupted.
    Unreserved,

    /// The reader was asked to buffer more bytes than its frame buffer
    /// can hold. This is a configuration/logic fault, not recoverable.
    CapacityExceeded,
}

impl Error {
    /// Returns a human-readable description of the error.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::Invalid => "invalid header",
            Error::Unsupported => "unsupported product type",
            Error::NoStart => "continuation frame before start",
            Error::Logic => "contract violation",
            Error::Io => "I/O error",
            Error::Eof => "end of stream",
            Error::NoMem => "allocation failure",
            Error::System => "system failure in sink",
            Error::Shutdown => "queue shut down",
            Error::TooBig => "reservation exceeds queue capacity",
            Error::NoSpace => "queue has no space available",
            Error::Unreserved => "released more bytes than were reserved",
            Error::CapacityExceeded => "frame exceeds reader buffer capacity",
        }
    }

    /// Whether this error is recovered locally (the caller discards the
    /// current frame/fragment and keeps going) as opposed to being
    /// surfaced to end the calling loop.
    pub const fn is_locally_recovered(&self) -> bool {
        matches!(self, Error::Invalid | Error::Unsupported | Error::NoStart)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}
