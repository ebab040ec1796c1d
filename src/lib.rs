//! dupesweep - duplicate and near-duplicate file finder
//!
//! The library is a pipeline of explicit steps:
//!
//! 1. [`duplicates::DuplicateFinder`] walks the include paths, hashes every
//!    file and groups them, exactly by content or by perceptual similarity
//!    for images and videos.
//! 2. [`policy::build_plan`] picks a keeper per group and plans an action
//!    for the rest.
//! 3. [`actions::execute`] applies (or simulates) the plan and returns a
//!    log that [`actions::undo`] can reverse.
//!
//! ```no_run
//! use dupesweep::actions::{execute, ExecuteOptions};
//! use dupesweep::duplicates::{DuplicateFinder, ScanConfig};
//! use dupesweep::policy::{build_plan, Policy};
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(&ScanConfig::new(vec!["/data".into()]))?;
//! println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
//!
//! let policy = Policy::default();
//! let plan = build_plan(&groups, &policy);
//! let result = execute(&plan, &ExecuteOptions::for_policy(&policy));
//! println!("{}", result.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod actions;
pub mod cancel;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod media;
pub mod policy;
pub mod presets;
pub mod progress;
pub mod scanner;

pub use cancel::CancellationToken;
pub use config::Settings;
pub use error::{ActionError, ConfigError};
