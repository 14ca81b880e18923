//! The transport-presentation reassembly contract.
//!
//! Tracks whether a start-of-product frame has been accepted for the
//! current `prod_sequence_num`, resetting on every product transition or
//! decode error. Owned exclusively by the parser thread — never shared
//! across threads, unlike the queue.

use log::debug;

use crate::header::ProdType;

/// What the transport layer should do with the current frame, decided by
/// [`ReassemblyState::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Start-of-product frame: dispatch the sink's start call.
    Start,
    /// Continuation of an already-started product: dispatch the sink's
    /// continuation call.
    Continuation,
    /// Continuation arrived before any start was accepted for this
    /// product: drop the frame silently.
    NoStart,
}

/// Per-product reassembly bookkeeping.
///
/// Retains the start frame's `prod_type`, mirroring the teacher's
/// `current_packet_id` retention in its channel receiver: a continuation
/// frame carries no PSH of its own, so the only place its `prod_type` can
/// come from is the start frame that opened the product.
#[derive(Debug, Default)]
pub struct ReassemblyState {
    start_processed: bool,
    current_prod_seq: Option<u32>,
    current_prod_type: Option<ProdType>,
}

impl ReassemblyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one frame's `prod_sequence_num`, start-of-product flag,
    /// and whether it carries a PSH. Returns whether the previous
    /// product just ended (the caller should call the sink's
    /// `end_product`) and the disposition for the current frame.
    ///
    /// A continuation frame carrying a PSH is accepted and logged at
    /// debug level rather than rejected — preserving the liberal
    /// parsing posture this protocol's documentation is known to be
    /// silent on.
    pub fn observe(&mut self, prod_sequence_num: u32, is_start: bool, has_psh: bool) -> (bool, Disposition) {
        let product_ended = match self.current_prod_seq {
            Some(prev) if prev != prod_sequence_num => true,
            _ => false,
        };
        if product_ended || self.current_prod_seq.is_none() {
            self.current_prod_seq = Some(prod_sequence_num);
            self.start_processed = false;
            self.current_prod_type = None;
        }

        let disposition = if is_start {
            Disposition::Start
        } else if self.start_processed {
            if has_psh {
                debug!("continuation frame for product {prod_sequence_num} carries a PSH");
            }
            Disposition::Continuation
        } else {
            Disposition::NoStart
        };

        (product_ended, disposition)
    }

    /// Records that the sink accepted the most recent start call, and
    /// retains its `prod_type` for continuation frames of this product,
    /// which carry no PSH of their own.
    pub fn mark_start_accepted(&mut self, prod_type: ProdType) {
        self.start_processed = true;
        self.current_prod_type = Some(prod_type);
    }

    /// The `prod_type` recorded by the most recent accepted start frame
    /// for the current product, if any.
    pub fn current_prod_type(&self) -> Option<ProdType> {
        self.current_prod_type
    }

    /// Clears all state, as if no product had ever been seen. Used after
    /// a surfaced (non-locally-recovered) error.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
