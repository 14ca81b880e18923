//! The byte source contract.
//!
//! The frame reader is agnostic to where its bytes come from: a UDP
//! multicast socket in the deployed pipeline, a file or an in-memory
//! buffer in tests. [`Read`] is that seam.

use crate::error::{Error, Result};

/// Outcome of a single [`Read::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the caller's buffer.
    Read(usize),

    /// The source reached a clean end of stream; no more bytes will ever
    /// arrive.
    Eof,

    /// The read was interrupted before any data arrived; the caller
    /// should retry immediately.
    Interrupted,
}

/// A byte source: read up to `buf.len()` bytes, no seek, no metadata.
pub trait Read {
    /// Reads into `buf`, returning how much of it was filled.
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Reads until `buf` is completely filled or the source reaches EOF.
    ///
    /// Returns the number of bytes actually written into `buf`; this is
    /// less than `buf.len()` only when EOF was reached partway through.
    fn read_fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(ReadOutcome::Read(0)) | Ok(ReadOutcome::Eof) => break,
                Ok(ReadOutcome::Read(n)) => filled += n,
                Ok(ReadOutcome::Interrupted) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// Blanket implementation over any `std::io::Read`, mapping its error
/// kinds onto the transport's abstract [`Error`] taxonomy.
impl<T: std::io::Read> Read for T {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        match std::io::Read::read(self, buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Read(n)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(ReadOutcome::Interrupted),
            Err(_) => Err(Error::Io),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_fill_stops_at_eof() {
        let mut src: &[u8] = b"hello";
        let mut buf = [0u8; 10];
        let n = src.read_fill(&mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn read_fill_reads_exact() {
        let mut src: &[u8] = b"hello world";
        let mut buf = [0u8; 5];
        let n = src.read_fill(&mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }
}
