//! A concrete [`PresentationSink`] standing in for the out-of-scope
//! GINI/NEXRAD/NWSTG product decoders: it counts bytes and blocks per
//! product and logs a summary on `end_product`, rather than decoding
//! anything.

use log::info;
use nbs_transport::{Error, ProdType, Result};
use nbs_transport::sink::PresentationSink;

/// Per-product counters, reset on every `end_product`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductTally {
    pub blocks: u32,
    pub bytes: u64,
    pub prod_type: Option<ProdType>,
}

/// Counts reassembled products instead of decoding them.
#[derive(Debug, Default)]
pub struct CountingSink {
    current: ProductTally,
    products_completed: u64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total products finalized so far.
    pub fn products_completed(&self) -> u64 {
        self.products_completed
    }

    fn record(&mut self, buf: &[u8]) {
        self.current.blocks += 1;
        self.current.bytes += buf.len() as u64;
    }
}

impl PresentationSink for CountingSink {
    fn gini_start(
        &mut self,
        buf: &[u8],
        _rec_len: u16,
        _recs_per_block: u8,
        is_compressed: bool,
        prod_type: ProdType,
        size_estimate: u32,
    ) -> Result<()> {
        self.current = ProductTally {
            blocks: 0,
            bytes: 0,
            prod_type: Some(prod_type),
        };
        self.record(buf);
        info!(
            "gini product started: type={prod_type:?} compressed={is_compressed} size_estimate={size_estimate}"
        );
        Ok(())
    }

    fn gini_block(&mut self, buf: &[u8], block_num: u16, _is_compressed: bool) -> Result<()> {
        if buf.is_empty() && block_num == 0 {
            return Err(Error::Invalid);
        }
        self.record(buf);
        Ok(())
    }

    fn nongoes(&mut self, buf: &[u8], is_start: bool, is_end: bool, _is_compressed: bool) -> Result<()> {
        if is_start {
            self.current = ProductTally::default();
        }
        self.record(buf);
        if is_end {
            info!("nongoes product ended after {} blocks", self.current.blocks);
        }
        Ok(())
    }

    fn nwstg(&mut self, buf: &[u8], is_start: bool, is_end: bool) -> Result<()> {
        if is_start {
            self.current = ProductTally::default();
        }
        self.record(buf);
        if is_end {
            info!("nwstg product ended after {} blocks", self.current.blocks);
        }
        Ok(())
    }

    fn nexrad(&mut self, buf: &[u8], is_start: bool, is_end: bool) -> Result<()> {
        if is_start {
            self.current = ProductTally::default();
        }
        self.record(buf);
        if is_end {
            info!("nexrad product ended after {} blocks", self.current.blocks);
        }
        Ok(())
    }

    fn end_product(&mut self) -> Result<()> {
        if self.current.blocks > 0 {
            self.products_completed += 1;
            info!(
                "product complete: {} blocks, {} bytes",
                self.current.blocks, self.current.bytes
            );
        }
        self.current = ProductTally::default();
        Ok(())
    }
}
