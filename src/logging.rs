//! Logging setup for hosts embedding dupesweep.
//!
//! The library only emits records through the `log` facade. A host that wants
//! them on stderr calls [`init_logging`] once; the level comes from, in
//! priority order:
//!
//! 1. `RUST_LOG` (if set)
//! 2. `quiet` (errors only) or the `verbose` count (debug / trace)
//! 3. info

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Install an `env_logger` backend.
///
/// Debug builds print a timestamp and, when verbose, the module path of each
/// record; release builds print level and message only.
///
/// Calling this twice is harmless: the second installation attempt is
/// ignored.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").is_ok();
    let mut builder = Builder::new();

    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        log::debug!("Logger already installed, keeping existing backend");
        return;
    }

    log::debug!(
        "Logging initialized at level {}{}",
        current_level_name(),
        if from_env { " (from RUST_LOG)" } else { "" }
    );
}

/// Map the host's verbosity flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} [{}] {}",
                    buf.timestamp_millis(),
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} {}",
                    buf.timestamp_seconds(),
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        });
    }
}

/// Name of the currently active maximum level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
