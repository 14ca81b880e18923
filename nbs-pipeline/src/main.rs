use clap::Parser;

use nbs_pipeline::cli::Args;
use nbs_pipeline::logging::{self, ReloadFlag};
use nbs_pipeline::pipeline::Pipeline;
use nbs_pipeline::socket::MulticastSocket;
use nbs_sink_demo::CountingSink;

fn main() {
    let args = Args::parse();
    logging::init(args.default_log_filter());

    if let Some(feed_type) = &args.feed_type {
        log::info!("feed-type filter requested: {feed_type} (advisory only)");
    }

    let socket = match MulticastSocket::join(args.mcast_group, args.mcast_iface) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to join multicast group: {e}");
            std::process::exit(1);
        }
    };
    log::info!(
        "listening on {:?}",
        socket.local_addr().ok()
    );

    let reload = match ReloadFlag::install() {
        Ok(r) => r,
        Err(e) => {
            log::error!("failed to install SIGHUP handler: {e}");
            std::process::exit(1);
        }
    };

    let sink = CountingSink::new();
    let pipeline = Pipeline::spawn(socket, sink, args.queue_config(), 250, reload);
    let outcome = pipeline.join();

    log::info!(
        "pipeline exited: {} frames processed, reader error: {:?}",
        outcome.frames_processed,
        outcome.reader_error
    );
}
