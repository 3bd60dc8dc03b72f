//! Application logging
//!
//! Thin facade over `tracing` so call sites can attach a context tag
//! (`Some("pipeline")`, `Some("extraction")`, ...) without caring which
//! subscriber is installed. [`init_logger`] writes to a daily-rolling file
//! under the app logs directory, or to stderr when that file cannot be opened.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::app_dirs;

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Log file prefix; the appender adds the date and `.log` suffix
const LOG_FILE_PREFIX: &str = "reaio";

/// Install the global subscriber.
///
/// Safe to call more than once: only the first call installs anything.
pub fn init_logger(log_dir: &Path) {
    if LOG_DIR.set(log_dir.to_path_buf()).is_err() {
        return;
    }
    std::fs::create_dir_all(log_dir).ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .ok()
        .map(|file_appender| {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // The worker must outlive every log call in the process.
            Box::leak(Box::new(guard));
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
        });
    let file_logging_enabled = file_layer.is_some();
    // The CLI prints progress itself; stderr only takes over without a log file.
    let stderr_layer = (!file_logging_enabled).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    if result.is_err() {
        // Another subscriber (tests, embedding host) already owns the global slot.
        return;
    }

    if file_logging_enabled {
        log_info(
            &format!("Logger initialized, log_dir={}", log_dir.display()),
            Some("logger"),
        );
    } else {
        tracing::warn!(
            "File logger unavailable, using stderr only (log_dir={})",
            log_dir.display()
        );
    }
}

pub fn log_info(message: &str, context: Option<&str>) {
    tracing::info!(context = context.unwrap_or("app"), "{}", message);
}

pub fn log_error(message: &str, context: Option<&str>) {
    tracing::error!(context = context.unwrap_or("app"), "{}", message);
}

/// Debug-level log with an optional source location (`file:line`).
pub fn log_debug(message: &str, context: Option<&str>, location: Option<&str>) {
    match location {
        Some(location) => tracing::debug!(
            context = context.unwrap_or("app"),
            location,
            "{}",
            message
        ),
        None => tracing::debug!(context = context.unwrap_or("app"), "{}", message),
    }
}

/// Folder holding the rolling log files
pub fn get_log_folder() -> PathBuf {
    LOG_DIR
        .get()
        .cloned()
        .unwrap_or_else(app_dirs::get_logs_dir)
}

/// `log_debug!(msg, "context")` records the call site automatically.
#[macro_export]
macro_rules! log_debug {
    ($msg:expr, $ctx:expr) => {
        $crate::logger::log_debug($msg, Some($ctx), Some(concat!(file!(), ":", line!())))
    };
}
