//! File actions module.
//!
//! This module provides functionality for:
//! - Applying or simulating a plan ([`execute`])
//! - Resolving target collisions ([`resolve_conflict`])
//! - Saving and verifying execution logs ([`ExecResult::persist`])
//! - Reversing a run ([`undo`])
//!
//! ```no_run
//! use dupesweep::actions::{execute, undo, ExecuteOptions, ExecResult};
//! use std::path::Path;
//!
//! # let plan: Vec<dupesweep::policy::PlanItem> = Vec::new();
//! let result = execute(&plan, &ExecuteOptions::default());
//! let log = result.persist(Path::new("/tmp/dupesweep_logs"))?;
//!
//! let reverted = undo(&ExecResult::load(&log)?);
//! println!("{}", reverted.summary());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod conflict;
pub mod executor;
pub mod journal;
pub mod undo;

pub use conflict::{
    numbered_candidate, resolve_conflict, ConflictPolicy, Resolution, MAX_RENAME_ATTEMPTS,
};
pub use executor::{execute, execute_with_callback, ExecProgressCallback, ExecuteOptions};
pub use journal::{ExecLogEntry, ExecResult, ExecStatus, LogKind};
pub use undo::undo;
