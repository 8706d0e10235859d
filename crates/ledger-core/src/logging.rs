//! Logging infrastructure for tokenledger.
//!
//! Structured logging through the `tracing` ecosystem: JSON lines to a daily
//! rolling file under `~/.tokenledger/logs/`, and a compact human-readable
//! layer on stderr that only shows warnings unless verbose.
//!
//! ## Example
//!
//! ```no_run
//! use ledger_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("scan started");
//! tracing::debug!(source = "codex", files = 12, "walking rollouts");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{LedgerError, Result};
use crate::paths;

/// Log file name prefix inside the log directory.
pub const LOG_FILE_NAME: &str = "tokenledger.log";

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.tokenledger/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// `RUST_LOG` overrides the level when set.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| LedgerError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tokenledger={default_level},ledger_usage={default_level},ledger_config={default_level},ledger_core={default_level}"
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_filter(if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LedgerError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Default log directory: `~/.tokenledger/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(paths::data_dir()?.join("logs"))
}
