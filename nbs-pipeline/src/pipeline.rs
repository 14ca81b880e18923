//! Spawns the reader and parser threads and wires them through the
//! shared frame queue, the way `SPEC_FULL.md` §5 describes: Thread R
//! owns the byte source and `reserve`/`release`; Thread P owns the
//! transport layer and `peek`/`remove`. Shutdown is cooperative and
//! propagates from the queue in both directions.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use nbs_transport::error::Error;
use nbs_transport::io::Read;
use nbs_transport::{FrameQueue, FrameReader, PresentationSink, QueueConfig, TransportLayer};

use crate::logging::ReloadFlag;

/// Cumulative counters exposed once the pipeline's threads have joined,
/// for the binary to log at shutdown.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub frames_processed: u64,
    pub reader_error: Option<Error>,
}

/// Owns the two `JoinHandle`s and the shared queue for one running
/// pipeline instance.
pub struct Pipeline {
    queue: Arc<FrameQueue>,
    reader_handle: JoinHandle<Option<Error>>,
    parser_handle: JoinHandle<u64>,
}

impl Pipeline {
    /// Spawns the reader thread (over `source`) and the parser thread
    /// (driving `sink`), sharing a queue built from `config`.
    ///
    /// `slow_reserve_warn_ms` is the design-note-(SUPPLEMENT) threshold:
    /// the reader logs a rate-limited warning whenever a single
    /// `reserve` call blocks longer than this, which is the directly
    /// observable symptom of a parser that can't keep up.
    pub fn spawn<R, S>(
        source: R,
        sink: S,
        config: QueueConfig,
        slow_reserve_warn_ms: u64,
        reload: ReloadFlag,
    ) -> Self
    where
        R: Read + Send + 'static,
        S: PresentationSink + Send + 'static,
    {
        let queue = Arc::new(FrameQueue::new(config.queue_bytes));

        let reader_queue = Arc::clone(&queue);
        let max_frame = config.max_frame_bytes;
        let reader_handle = thread::spawn(move || {
            run_reader(source, reader_queue, max_frame, slow_reserve_warn_ms)
        });

        let parser_queue = Arc::clone(&queue);
        let parser_handle = thread::spawn(move || run_parser(parser_queue, sink, reload));

        Self {
            queue,
            reader_handle,
            parser_handle,
        }
    }

    /// Blocks until both threads have exited, returning summary counters.
    pub fn join(self) -> PipelineOutcome {
        let reader_error = self.reader_handle.join().unwrap_or(None);
        let frames_processed = self.parser_handle.join().unwrap_or(0);
        PipelineOutcome {
            frames_processed,
            reader_error,
        }
    }

    /// The shared queue, exposed for tests and metrics.
    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }
}

fn run_reader<R: Read>(
    source: R,
    queue: Arc<FrameQueue>,
    max_frame: usize,
    slow_reserve_warn_ms: u64,
) -> Option<Error> {
    let mut reader = FrameReader::new(source, max_frame);
    let slow_threshold = Duration::from_millis(slow_reserve_warn_ms);
    let mut last_warned: Option<Instant> = None;

    loop {
        match reader.next_frame() {
            Ok(frame) => {
                let len = frame.bytes.len();
                let started = Instant::now();
                let reservation = queue.reserve(len);
                let waited = started.elapsed();
                let should_warn = match last_warned {
                    Some(t) => t.elapsed() > Duration::from_secs(1),
                    None => true,
                };
                if waited > slow_threshold && should_warn {
                    warn!("reserve blocked for {waited:?}, parser may be falling behind");
                    last_warned = Some(Instant::now());
                }
                match reservation {
                    Ok(slice) => {
                        slice.copy_from_slice(frame.bytes);
                        if let Err(e) = queue.release(len) {
                            error!("release failed: {e}");
                            return Some(e);
                        }
                    }
                    Err(Error::Shutdown) => return None,
                    Err(e) => {
                        error!("reserve failed: {e}");
                        return Some(e);
                    }
                }
            }
            Err(Error::Eof) => {
                info!("byte source reached EOF, shutting down queue");
                queue.shutdown();
                return None;
            }
            Err(e) => {
                error!("reader thread terminating: {e}");
                queue.shutdown();
                return Some(e);
            }
        }
    }
}

fn run_parser<S: PresentationSink>(queue: Arc<FrameQueue>, sink: S, reload: ReloadFlag) -> u64 {
    let mut transport = TransportLayer::new(sink);
    let mut processed = 0u64;

    loop {
        if reload.take() {
            debug!("SIGHUP observed, reloading logger configuration");
        }
        match queue.peek() {
            Ok(bytes) => {
                if let Err(e) = transport.process_bytes(bytes) {
                    if !e.is_locally_recovered() {
                        error!("surfaced transport error, resetting reassembly state: {e}");
                        transport.reset();
                    }
                }
                if let Err(e) = queue.remove() {
                    error!("remove failed: {e}");
                    break;
                }
                processed += 1;
            }
            Err(Error::Shutdown) => {
                info!("queue shut down and drained, finalizing sink");
                let _ = transport.sink_mut().end_product();
                break;
            }
            Err(e) => {
                error!("unexpected queue error: {e}");
                break;
            }
        }
    }
    processed
}
