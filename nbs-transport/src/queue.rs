//! The Frame Queue: a bounded, single-producer/single-consumer byte ring
//! that decouples the reader thread from the parser thread.
//!
//! The ring is treated as an arena of variable-length frame records
//! (`SPEC_FULL.md` §9, "The queue as arena"): record sizes are tracked
//! out-of-band in a parallel FIFO so that frame bytes never have to be
//! self-describing. A reservation that would straddle the physical end
//! of the buffer instead rewinds to offset zero and records a `Rewind`
//! marker for the consumer to skip — the same trick a lock-free SPSC
//! variable-record queue uses to avoid splitting a record across the
//! ring boundary (the pattern is adapted from such a queue found
//! elsewhere in this pack; the teacher's own ring buffer is a simple
//! byte stream and splits records freely, which this protocol's "peek
//! returns one contiguous frame" contract cannot allow).
//!
//! A `Mutex` protects only the bookkeeping (`head`, `tail`, `used`, the
//! record FIFO, the shutdown flag, and statistics) — exactly the fields
//! `SPEC_FULL.md` §5 says the lock protects. The byte storage itself
//! lives behind an [`UnsafeCell`] so that the producer can write into its
//! reserved region, and the consumer can read an already-released region,
//! without holding the lock across the copy: the bookkeeping guarantees
//! the two regions never overlap. No pointer is ever handed across the
//! thread boundary — each side derives its own pointer, under its own
//! lock acquisition, from the `FrameQueue` it already shares through an
//! `Arc`.

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

/// One accounting record in the out-of-band length FIFO.
#[derive(Debug, Clone, Copy)]
enum Record {
    /// A released frame of the given length, starting at the consumer's
    /// current head position.
    Frame(usize),
    /// `len` bytes of wasted space between the physical head position and
    /// the end of the buffer, produced when a reservation rewound to
    /// offset zero instead of straddling the boundary.
    Rewind(usize),
}

/// Cumulative statistics reported by [`FrameQueue::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    /// Number of frames released so far.
    pub frame_count: u64,
    /// Sum of all released frame sizes.
    pub total_bytes: u64,
    /// Size in bytes of the first frame ever released.
    pub first_frame_size: Option<usize>,
    /// Smallest frame size released so far.
    pub smallest_frame: Option<usize>,
    /// Largest frame size released so far.
    pub largest_frame: Option<usize>,
    sum_dev: i64,
    sum_sqr_dev: i128,
}

impl QueueStats {
    fn record(&mut self, size: usize) {
        self.frame_count += 1;
        self.total_bytes += size as u64;
        let first = *self.first_frame_size.get_or_insert(size);
        self.smallest_frame = Some(self.smallest_frame.map_or(size, |s| s.min(size)));
        self.largest_frame = Some(self.largest_frame.map_or(size, |s| s.max(size)));
        let dev = size as i64 - first as i64;
        self.sum_dev += dev;
        self.sum_sqr_dev += (dev as i128) * (dev as i128);
    }

    /// Online sample variance of frame size deviation from the first
    /// frame's size, or `None` with fewer than two samples.
    pub fn variance(&self) -> Option<f64> {
        let n = self.frame_count;
        if n < 2 {
            return None;
        }
        let n = n as f64;
        let sum_dev = self.sum_dev as f64;
        let sum_sqr_dev = self.sum_sqr_dev as f64;
        Some((sum_sqr_dev - sum_dev * sum_dev / n) / (n - 1.0))
    }
}

struct Inner {
    capacity: usize,
    head: usize,
    tail: usize,
    used: usize,
    records: VecDeque<Record>,
    reservation: Option<(usize, usize)>, // (offset, len)
    shut_down: bool,
    stats: QueueStats,
}

/// A bounded SPSC byte ring for frame buffers, with reserve/release on
/// the producer side and peek/remove on the consumer side.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    not_full: Condvar,
    not_empty: Condvar,
    buf: UnsafeCell<Box<[u8]>>,
}

// SAFETY: `buf` is only ever sliced within `reserve`/`try_reserve` (for
// the producer-owned reservation region) and `peek`/`try_peek` (for a
// consumer-owned, already-released region). `Inner`, guarded by `inner`,
// is the single source of truth for which byte ranges are currently
// reserved versus released, and the two kinds of regions are disjoint by
// construction. The queue's contract additionally requires that `reserve`
// is only ever called from one thread and `peek` only from another, so
// there is never more than one live mutable borrow of `buf` at a time.
unsafe impl Sync for FrameQueue {}

impl FrameQueue {
    /// Creates a queue with the given total byte capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                head: 0,
                tail: 0,
                used: 0,
                records: VecDeque::new(),
                reservation: None,
                shut_down: false,
                stats: QueueStats::default(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            buf: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
        }
    }

    fn buf_ptr(&self) -> *mut u8 {
        // SAFETY: the boxed slice is allocated once in `new` and never
        // moved or resized afterwards, so this pointer stays valid for
        // the lifetime of `self`.
        unsafe { (*self.buf.get()).as_mut_ptr() }
    }

    /// Blocks until `n` contiguous bytes are free, then returns a mutable
    /// slice to write into. Only one reservation may be outstanding at a
    /// time.
    pub fn reserve(&self, n: usize) -> Result<&mut [u8]> {
        let mut guard = self.inner.lock().unwrap();
        if n > guard.capacity {
            return Err(Error::TooBig);
        }
        loop {
            if guard.shut_down {
                return Err(Error::Shutdown);
            }
            if let Some(offset) = Self::try_claim(&mut guard, n) {
                // SAFETY: see the `unsafe impl Sync` justification above;
                // `offset..offset+n` was just claimed exclusively for the
                // producer by `try_claim`.
                return Ok(unsafe {
                    core::slice::from_raw_parts_mut(self.buf_ptr().add(offset), n)
                });
            }
            guard = self.not_full.wait(guard).unwrap();
        }
    }

    /// Non-blocking variant of [`FrameQueue::reserve`].
    pub fn try_reserve(&self, n: usize) -> Result<&mut [u8]> {
        let mut guard = self.inner.lock().unwrap();
        if n > guard.capacity {
            return Err(Error::TooBig);
        }
        if guard.shut_down {
            return Err(Error::Shutdown);
        }
        match Self::try_claim(&mut guard, n) {
            Some(offset) => Ok(unsafe {
                core::slice::from_raw_parts_mut(self.buf_ptr().add(offset), n)
            }),
            None => Err(Error::NoSpace),
        }
    }

    /// Attempts to claim `n` contiguous bytes at the current tail,
    /// rewinding to offset zero first if necessary. Returns the offset of
    /// the claimed region.
    fn try_claim(guard: &mut Inner, n: usize) -> Option<usize> {
        let to_end = guard.capacity - guard.tail;
        let (offset, pad) = if to_end >= n {
            (guard.tail, 0)
        } else {
            (0, to_end)
        };
        if guard.used + pad + n > guard.capacity {
            return None;
        }
        if pad > 0 {
            guard.records.push_back(Record::Rewind(pad));
            guard.used += pad;
            guard.tail = 0;
        }
        guard.used += n;
        guard.reservation = Some((offset, n));
        Some(offset)
    }

    /// Commits the first `k` bytes of the most recent reservation as a
    /// released frame. `k == 0` cancels the reservation; any unused tail
    /// of the reservation is returned to the free pool immediately.
    pub fn release(&self, k: usize) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let (offset, reserved_n) = guard.reservation.take().ok_or(Error::Unreserved)?;
        if k > reserved_n {
            guard.reservation = Some((offset, reserved_n));
            return Err(Error::Unreserved);
        }
        let give_back = reserved_n - k;
        guard.used -= give_back;
        guard.tail = offset + k;
        if k > 0 {
            guard.stats.record(k);
            guard.records.push_back(Record::Frame(k));
        }
        drop(guard);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until a frame is available, then returns its bytes. Blocks
    /// forever once empty unless [`FrameQueue::shutdown`] has been
    /// called, at which point it returns [`Error::Shutdown`].
    pub fn peek(&self) -> Result<&[u8]> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some((offset, len)) = Self::skip_rewinds_and_peek(&mut guard) {
                // SAFETY: `offset..offset+len` names an already-released
                // frame; the producer's reservation, if any, never
                // overlaps it.
                return Ok(unsafe {
                    core::slice::from_raw_parts(self.buf_ptr().add(offset), len)
                });
            }
            if guard.shut_down {
                return Err(Error::Shutdown);
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Non-blocking variant of [`FrameQueue::peek`]. Returns `Ok(None)`
    /// if nothing is ready yet.
    pub fn try_peek(&self) -> Result<Option<&[u8]>> {
        let mut guard = self.inner.lock().unwrap();
        if let Some((offset, len)) = Self::skip_rewinds_and_peek(&mut guard) {
            return Ok(Some(unsafe {
                core::slice::from_raw_parts(self.buf_ptr().add(offset), len)
            }));
        }
        if guard.shut_down {
            return Err(Error::Shutdown);
        }
        Ok(None)
    }

    /// Pops any leading `Rewind` records (advancing `head` past wasted
    /// space), then returns the offset and length of the next `Frame`
    /// record without removing it.
    fn skip_rewinds_and_peek(guard: &mut Inner) -> Option<(usize, usize)> {
        loop {
            match guard.records.front().copied() {
                Some(Record::Rewind(pad)) => {
                    guard.records.pop_front();
                    guard.head = 0;
                    guard.used -= pad;
                }
                Some(Record::Frame(len)) => return Some((guard.head, len)),
                None => return None,
            }
        }
    }

    /// Discards the frame most recently returned by [`FrameQueue::peek`]
    /// or [`FrameQueue::try_peek`].
    pub fn remove(&self) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        match guard.records.pop_front() {
            Some(Record::Frame(len)) => {
                guard.head += len;
                guard.used -= len;
                drop(guard);
                self.not_full.notify_one();
                Ok(())
            }
            Some(other) => {
                guard.records.push_front(other);
                Err(Error::Logic)
            }
            None => Err(Error::Logic),
        }
    }

    /// Idempotently shuts the queue down: the reader thread is done
    /// producing. `peek` keeps returning already-released frames and only
    /// returns [`Error::Shutdown`] once the queue is drained.
    pub fn shutdown(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.shut_down = true;
        drop(guard);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Returns a snapshot of cumulative queue statistics.
    pub fn stats(&self) -> QueueStats {
        self.inner.lock().unwrap().stats
    }

    /// Total byte capacity of the ring.
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}
