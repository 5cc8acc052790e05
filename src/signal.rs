//! Process-wide shutdown token driven by SIGINT/SIGTERM.

use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag set once when the process is asked to stop.
///
/// The signal handler is the only writer; the acquisition loop and the
/// driver's blocking reads poll it.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns false if it was already set.
    pub fn trigger(&self) -> bool {
        !self.triggered.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Register the Ctrl-C / SIGTERM handler and return its token.
///
/// Can only be called once per process; `ctrlc` rejects a second handler.
pub fn install() -> Result<Shutdown> {
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        if handle.trigger() {
            log::info!("Signal received, stopping...");
        }
    })?;
    Ok(shutdown)
}
