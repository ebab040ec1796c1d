//! Scan progress events and sinks.
//!
//! The finder reports [`Progress`] events to a [`ProgressSink`] passed in
//! through the scan configuration. Sinks are called from worker threads and
//! must return quickly without blocking I/O; hosts that want to render
//! updates should forward them through [`ChannelSink`] or coalesce them the
//! way [`TerminalProgress`] does.

use std::fmt;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Traversing include roots.
    Walking,
    /// Hashing discovered files.
    Hashing,
    /// Building duplicate groups.
    Grouping,
    /// Scan finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Walking => write!(f, "walking"),
            Self::Hashing => write!(f, "hashing"),
            Self::Grouping => write!(f, "grouping"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A transient progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current stage
    pub stage: Stage,
    /// Files discovered (walking) or hashed (later stages) so far
    pub files_scanned: usize,
    /// Duplicate groups found so far
    pub groups_found: usize,
}

impl Progress {
    /// Create a new progress snapshot.
    #[must_use]
    pub fn new(stage: Stage, files_scanned: usize, groups_found: usize) -> Self {
        Self {
            stage,
            files_scanned,
            groups_found,
        }
    }
}

/// Receiver of scan progress events.
///
/// Implementations must be cheap and non-blocking.
pub trait ProgressSink: Send + Sync {
    /// Called for every emitted event.
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress);
    }
}

/// Forwards events into a bounded channel, dropping them when it is full.
#[derive(Debug)]
pub struct ChannelSink {
    sender: SyncSender<Progress>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<Progress>) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, progress: Progress) {
        match self.sender.try_send(progress) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::trace!("Progress channel full, dropping {} event", progress.stage);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Spinner on stderr for hosts without their own progress display.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl TerminalProgress {
    /// Create a reporter; `quiet` suppresses all output.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }
}

impl ProgressSink for TerminalProgress {
    fn on_progress(&self, progress: Progress) {
        if self.quiet {
            return;
        }
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };

        let bar = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        let message = format!(
            "{}: {} files, {} groups",
            progress.stage, progress.files_scanned, progress.groups_found
        );

        if progress.stage == Stage::Done {
            bar.finish_with_message(message);
            *guard = None;
        } else {
            bar.set_message(message);
        }
    }
}
