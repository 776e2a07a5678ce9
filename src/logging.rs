//! Logging setup
//!
//! Two outputs: the log file, rewritten on every start, and an echo on
//! stderr. In debug mode both take everything from DEBUG up; otherwise the
//! file keeps INFO and up and the console shows errors only. `RUST_LOG`
//! overrides the file filter.

use crate::error::{Result, XrdError};
use std::fs::File;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Timestamp format for log lines
pub const TIME_FORMAT: &str = "%m-%d %H:%M";

/// Local time, minutes resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortTime;

impl FormatTime for ShortTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format(TIME_FORMAT))
    }
}

/// File log level
pub fn file_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Console log level
pub fn console_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::ERROR
    }
}

/// Install the global subscriber
///
/// Creates the log file's directory when needed and truncates the file.
/// Returns the guard that must be kept alive for the duration of the program.
pub fn setup_logging(debug: bool, log_file: &Path) -> Result<WorkerGuard> {
    if let Some(dir) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(log_file)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let file_filter = EnvFilter::builder()
        .with_default_directive(file_level(debug).into())
        .from_env_lossy();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(ShortTime)
        .with_filter(file_filter);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .with_filter(console_level(debug));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| XrdError::Configuration(format!("Logging already set up: {}", e)))?;

    tracing::debug!("Logging to {:?}", log_file);
    Ok(guard)
}
