//! Logger bootstrap and the `SIGHUP`-driven reconfiguration flag.
//!
//! The core `nbs_transport` stack is not itself signal-aware (design
//! note "Signal-driven reconfiguration"); only this crate touches
//! signals, flipping an `AtomicBool` the parser thread's loop checks at
//! each iteration boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// Initializes `env_logger`, honoring `RUST_LOG` if set and falling back
/// to `default_filter` otherwise.
pub fn init(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// A `SIGHUP`-driven "please reload" flag, checked at loop boundaries by
/// the parser thread.
#[derive(Clone)]
pub struct ReloadFlag(Arc<AtomicBool>);

impl ReloadFlag {
    /// Installs a `SIGHUP` handler that sets this flag.
    pub fn install() -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&flag))
            .map_err(PipelineError::Signal)?;
        Ok(Self(flag))
    }

    /// Returns `true` exactly once per `SIGHUP`, clearing the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
