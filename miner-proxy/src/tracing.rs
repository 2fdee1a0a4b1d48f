//! Provide tracing, tailored to this program.
//!
//! At startup, the program should call [`init`] to install a tracing
//! subscriber. Events always go to a rotated log file under the configured
//! log directory (the operator's debugging surface for the one-click
//! installer); they additionally go to journald when running under systemd,
//! or to stdout otherwise.
//!
//! The rest of the program can include `use crate::tracing::prelude::*` for
//! convenient access to the `trace!()`, `debug!()`, `info!()`, `warn!()`,
//! and `error!()` macros.

use std::env;
use std::path::Path;
use time::OffsetDateTime;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_journald;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

use crate::error::{Error, Result};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{trace, debug, info, warn, error};
}

/// Number of rotated log files kept before the oldest is deleted.
const MAX_LOG_FILES: usize = 10;

/// Initialize logging.
///
/// Installs a daily-rotated file writer under `log_dir` plus either a
/// journald layer (when running under systemd) or a stdout layer. Returns
/// a guard that must be held for the lifetime of the process; dropping it
/// flushes and stops the background file writer.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("miner-proxy")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| {
            Error::Config(format!(
                "cannot open log directory {}: {e}",
                log_dir.display()
            ))
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_timer(FileTimer);

    let journald_layer = if env::var("JOURNAL_STREAM").is_ok() {
        tracing_journald::layer().ok()
    } else {
        None
    };
    let stdout_layer = if journald_layer.is_none() {
        Some(tracing_subscriber::fmt::layer().with_timer(LocalTimer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(journald_layer)
        .with(stdout_layer)
        .init();

    Ok(guard)
}

// Provide our own timer that formats timestamps in local time and to the
// nearest second. The default timer was in UTC and formatted timestamps as
// a long, ugly string.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now =
            OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        write!(
            w,
            "{}",
            now.format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .unwrap(),
        )
    }
}

// The file log keeps the full date; rotated files are read days later.
struct FileTimer;

impl FormatTime for FileTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now =
            OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        write!(
            w,
            "{}",
            now.format(time::macros::format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .unwrap(),
        )
    }
}
