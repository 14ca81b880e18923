//! The transport layer: decode, sequence tracking, and product-type
//! dispatch, driven one frame at a time by the parser thread.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::frame::DecodedFrame;
use crate::header::{
    FrameHeader, ProdType, ProductDefinitionHeader, ProductSpecificHeader, TransType, FH_SIZE,
    SBN_COMMAND_DATA, SBN_COMMAND_SYNC,
};
use crate::reassembly::{Disposition, ReassemblyState};
use crate::sink::{PresentationSink, GINI_FRAGMENT_SIZE};

/// Drives a [`PresentationSink`] from a stream of decoded frames.
///
/// Holds no byte buffer of its own: every frame it processes is borrowed
/// from the caller (typically a [`crate::queue::FrameQueue`] peek) for
/// the duration of one [`TransportLayer::process`] call.
pub struct TransportLayer<S: PresentationSink> {
    sink: S,
    reassembly: ReassemblyState,
}

impl<S: PresentationSink> TransportLayer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            reassembly: ReassemblyState::new(),
        }
    }

    /// Decodes FH, then PDH/PSH as needed, from one frame's raw bytes as
    /// peeked off the queue, and processes it. This is steps 1–5 of the
    /// transport contract; step 1's "decode FH, discard on failure" is
    /// folded into the `?` on `FrameHeader::decode`.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let fh = FrameHeader::decode(bytes)?;
        if fh.sbn_command == SBN_COMMAND_SYNC {
            return Ok(());
        }
        if fh.sbn_command != SBN_COMMAND_DATA {
            return Err(Error::Unsupported);
        }

        let pdh = ProductDefinitionHeader::decode(&bytes[FH_SIZE..])?;
        let psh = if pdh.psh_length() > 0 {
            Some(ProductSpecificHeader::decode(
                &bytes[FH_SIZE + pdh.pdh_length as usize..],
            )?)
        } else {
            None
        };

        let data_end = FH_SIZE + pdh.data_offset as usize + pdh.data_size as usize;
        if data_end > bytes.len() {
            return Err(Error::Invalid);
        }

        let frame = DecodedFrame {
            bytes,
            fh,
            pdh: Some(pdh),
            psh,
        };
        self.process(&frame)
    }

    /// Consumes the already FH/PDH/PSH-decoded `frame`.
    ///
    /// Sync frames (`sbn_command == 5`) are accepted and then ignored:
    /// they carry no product data and do not touch reassembly state
    /// (testable scenario 6).
    pub fn process(&mut self, frame: &DecodedFrame<'_>) -> Result<()> {
        if frame.fh.sbn_command == SBN_COMMAND_SYNC {
            return Ok(());
        }

        let pdh = frame.pdh.ok_or(Error::Invalid)?;

        let is_start = pdh.trans_type.contains(TransType::START_OF_PRODUCT);
        let is_end = pdh.trans_type.contains(TransType::END_OF_PRODUCT);
        let is_compressed = pdh.trans_type.contains(TransType::DATA_COMPRESSED);
        let has_psh = frame.psh.is_some();

        let (product_ended, disposition) =
            self.reassembly
                .observe(pdh.prod_sequence_num, is_start, has_psh);

        if product_ended {
            self.sink.end_product()?;
        }

        match disposition {
            Disposition::NoStart => {
                debug!(
                    "continuation frame for product {} arrived with no prior start",
                    pdh.prod_sequence_num
                );
                return Err(Error::NoStart);
            }
            Disposition::Start | Disposition::Continuation => {
                self.dispatch(frame, &pdh, disposition, is_start, is_end, is_compressed)?;
                if disposition == Disposition::Start {
                    if let Some(psh) = frame.psh {
                        self.reassembly.mark_start_accepted(psh.prod_type);
                    }
                }
            }
        }

        Ok(())
    }

    fn dispatch(
        &mut self,
        frame: &DecodedFrame<'_>,
        pdh: &crate::header::ProductDefinitionHeader,
        disposition: Disposition,
        is_start: bool,
        is_end: bool,
        is_compressed: bool,
    ) -> Result<()> {
        let data = frame.data();

        // Continuation frames carry no PSH of their own (spec §3: "non-start
        // frames without a PSH are normal"), so their `prod_type` comes from
        // the start frame that opened the product, retained by
        // `ReassemblyState` the way the teacher's channel receiver retains
        // `current_packet_id` across a multi-frame receive.
        let prod_type = frame.psh.map(|psh| psh.prod_type).or_else(|| {
            if disposition == Disposition::Continuation {
                self.reassembly.current_prod_type()
            } else {
                None
            }
        });

        match prod_type {
            Some(ProdType::GoesEast) | Some(ProdType::GoesWest) if disposition == Disposition::Start => {
                let psh = frame.psh.unwrap();
                let size_estimate = psh.num_fragments.map_or(1, |n| n.max(1)) as u32 * GINI_FRAGMENT_SIZE;
                self.sink.gini_start(
                    data,
                    psh.bytes_per_rec,
                    pdh.recs_per_block,
                    is_compressed,
                    psh.prod_type,
                    size_estimate,
                )
            }
            Some(ProdType::GoesEast) | Some(ProdType::GoesWest) => {
                self.sink.gini_block(data, pdh.block_num, is_compressed)
            }
            Some(ProdType::NesdisNonGoes) | Some(ProdType::NoaaportOpt) => {
                self.sink.nongoes(data, is_start, is_end, is_compressed)
            }
            Some(ProdType::Nwstg) => self.sink.nwstg(data, is_start, is_end),
            Some(ProdType::Nexrad) => self.sink.nexrad(data, is_start, is_end),
            Some(ProdType::Other(code)) => {
                warn!("discarding frame with unsupported product type {code}");
                Err(Error::Unsupported)
            }
            None => Err(Error::Unsupported),
        }
    }

    /// Borrows the sink, for tests and for shutdown-time finalization.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Resets reassembly state, e.g. after a surfaced error forces the
    /// parser to resynchronize at the product level.
    pub fn reset(&mut self) {
        self.reassembly.reset();
    }
}
