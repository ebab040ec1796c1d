//! Cooperative cancellation for scans.
//!
//! A [`CancellationToken`] wraps a shared `AtomicBool`. The walker checks it
//! for every traversal entry, the hashing pool for every file and the
//! clusterer for every iteration; once set, the scan returns
//! [`FinderError::Interrupted`](crate::duplicates::FinderError::Interrupted).
//!
//! ```rust,no_run
//! use dupesweep::cancel::install_ctrlc_handler;
//!
//! let token = install_ctrlc_handler().expect("Failed to install signal handler");
//! // Pass `token` into ScanConfig::with_cancellation(...)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag, e.g. one shared with other subsystems.
    #[must_use]
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another scan.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Install a Ctrl+C handler that cancels the returned token.
///
/// A second Ctrl+C while the first is still being honored exits the process
/// with status 130.
///
/// # Errors
///
/// Returns an error if a handler is already installed for this process.
pub fn install_ctrlc_handler() -> Result<CancellationToken, ctrlc::Error> {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        log::warn!("Interrupted, finishing current step...");
        handler_token.cancel();
    })?;

    log::debug!("Ctrl+C handler installed");
    Ok(token)
}
