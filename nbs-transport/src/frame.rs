//! A decoded frame: header(s) plus the byte range of its data block.
//!
//! `DecodedFrame` never owns the frame bytes — it borrows them from the
//! reader's internal buffer for the lifetime of one reader call, the way
//! the transport layer borrows from the frame queue's most recent `peek`.

use crate::error::{Error, Result};
use crate::header::{FrameHeader, ProductDefinitionHeader, ProductSpecificHeader, FH_SIZE};

/// A single decoded frame borrowed from a reader or queue buffer.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    /// The complete frame bytes, from the sentinel through the end of the
    /// data block.
    pub bytes: &'a [u8],

    /// The decoded Frame Header.
    pub fh: FrameHeader,

    /// The decoded Product-Definition Header, present on every frame
    /// except sync frames.
    pub pdh: Option<ProductDefinitionHeader>,

    /// The decoded Product-Specific Header, present when `pdh.psh_length()
    /// > 0`.
    pub psh: Option<ProductSpecificHeader>,
}

impl<'a> DecodedFrame<'a> {
    /// The data block carried by this frame, or an empty slice for
    /// sync/test frames.
    pub fn data(&self) -> &'a [u8] {
        match self.pdh {
            Some(pdh) => {
                let start = FH_SIZE + pdh.data_offset as usize;
                let end = start + pdh.data_size as usize;
                &self.bytes[start..end]
            }
            None => &[],
        }
    }

    /// Validates the cross-header invariants from `SPEC_FULL.md` §3:
    /// `data_offset + data_size <= frame_size <= buffer_capacity`, and
    /// `fh_size + total_header_size + data_size <= buffer_capacity`.
    pub fn validate(&self, buffer_capacity: usize) -> Result<()> {
        if self.fh.sbn_length as usize != FH_SIZE {
            return Err(Error::Invalid);
        }
        if let Some(pdh) = self.pdh {
            let frame_size = FH_SIZE + pdh.total_header_size as usize + pdh.data_size as usize;
            if frame_size > buffer_capacity {
                return Err(Error::Invalid);
            }
            let data_end = pdh.data_offset as usize + pdh.data_size as usize;
            if data_end > frame_size {
                return Err(Error::Invalid);
            }
            if self.bytes.len() != frame_size {
                return Err(Error::Invalid);
            }
        }
        Ok(())
    }
}
