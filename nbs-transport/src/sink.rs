//! The presentation sink contract: the downstream consumer of
//! reassembled product blocks, external to this core stack.
//!
//! `nbs-sink-demo` provides one concrete implementation that counts
//! bytes and blocks instead of decoding GINI/NEXRAD/NWSTG formats —
//! those decoders are out of scope here.

use crate::error::{Error, Result};
use crate::header::ProdType;

/// Downstream consumer of reassembled product data blocks.
///
/// Every method returns `Ok(())` on acceptance or one of
/// [`Error::Invalid`], [`Error::Logic`], [`Error::NoMem`],
/// [`Error::System`] — the same subset the transport layer treats as
/// surfaced-or-recovered per the error taxonomy.
pub trait PresentationSink {
    /// Starts a new GOES-East/West product.
    #[allow(clippy::too_many_arguments)]
    fn gini_start(
        &mut self,
        buf: &[u8],
        rec_len: u16,
        recs_per_block: u8,
        is_compressed: bool,
        prod_type: ProdType,
        size_estimate: u32,
    ) -> Result<()>;

    /// A continuation block of a GINI product.
    fn gini_block(&mut self, buf: &[u8], block_num: u16, is_compressed: bool) -> Result<()>;

    /// A NESDIS-non-GOES or NOAAPORT-optional block (start or
    /// continuation, distinguished by `is_start`/`is_end`).
    fn nongoes(&mut self, buf: &[u8], is_start: bool, is_end: bool, is_compressed: bool) -> Result<()>;

    /// An NWSTG text-product block.
    fn nwstg(&mut self, buf: &[u8], is_start: bool, is_end: bool) -> Result<()>;

    /// A NEXRAD radar-product block.
    fn nexrad(&mut self, buf: &[u8], is_start: bool, is_end: bool) -> Result<()>;

    /// Finalizes any in-flight product. Idempotent: calling it with no
    /// product in flight is a no-op, not an error.
    fn end_product(&mut self) -> Result<()>;
}

/// Size estimate in bytes per fragment, used by [`crate::transport`] to
/// compute `gini_start`'s `size_estimate` as
/// `max(num_fragments, 1) * GINI_FRAGMENT_SIZE`.
pub const GINI_FRAGMENT_SIZE: u32 = 5120;

/// A sink that rejects every call with [`Error::System`], useful as a
/// placeholder and in tests that assert sink errors propagate correctly.
#[derive(Debug, Default)]
pub struct FailingSink;

impl PresentationSink for FailingSink {
    fn gini_start(
        &mut self,
        _buf: &[u8],
        _rec_len: u16,
        _recs_per_block: u8,
        _is_compressed: bool,
        _prod_type: ProdType,
        _size_estimate: u32,
    ) -> Result<()> {
        Err(Error::System)
    }

    fn gini_block(&mut self, _buf: &[u8], _block_num: u16, _is_compressed: bool) -> Result<()> {
        Err(Error::System)
    }

    fn nongoes(&mut self, _buf: &[u8], _is_start: bool, _is_end: bool, _is_compressed: bool) -> Result<()> {
        Err(Error::System)
    }

    fn nwstg(&mut self, _buf: &[u8], _is_start: bool, _is_end: bool) -> Result<()> {
        Err(Error::System)
    }

    fn nexrad(&mut self, _buf: &[u8], _is_start: bool, _is_end: bool) -> Result<()> {
        Err(Error::System)
    }

    fn end_product(&mut self) -> Result<()> {
        Err(Error::System)
    }
}
