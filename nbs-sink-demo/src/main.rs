//! Standalone demo: reads a file of concatenated NBS frames and drives
//! them through a `FrameReader` + `TransportLayer` pair into a
//! `CountingSink`, printing the tally at the end. Exercises the core
//! stack from outside, the way the teacher's `client` binary exercises
//! its transport crate against a running `server`.

use std::env;
use std::fs::File;

use nbs_sink_demo::CountingSink;
use nbs_transport::error::Error;
use nbs_transport::{FrameReader, TransportLayer};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: nbs-sink-demo <frame-stream-file>");
            std::process::exit(2);
        }
    };

    let file = File::open(&path).unwrap_or_else(|e| {
        eprintln!("failed to open {path}: {e}");
        std::process::exit(1);
    });

    let mut reader = FrameReader::new(file, 65_507);
    let mut transport = TransportLayer::new(CountingSink::new());
    let mut frames = 0u64;

    loop {
        match reader.next_frame() {
            Ok(frame) => {
                frames += 1;
                if let Err(e) = transport.process(&frame) {
                    if !e.is_locally_recovered() {
                        log::error!("surfaced error processing frame {frames}: {e}");
                        transport.reset();
                    }
                }
            }
            Err(Error::Eof) => break,
            Err(e) => {
                eprintln!("reader terminated: {e}");
                break;
            }
        }
    }

    println!(
        "processed {frames} frames, {} products completed",
        transport.sink_mut().products_completed()
    );
}
