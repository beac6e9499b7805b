//! ROV Bridge
//!
//! Hosts the autopilot executor behind a JSON-lines transport: inbound
//! events are read from stdin, vehicle commands and observer events are
//! written to stdout. Logs go to stderr and, optionally, to daily rolling
//! files.

pub mod config;
pub mod error;
pub mod event;
pub mod ops;

pub use config::Args;
pub use error::BridgeError;

use event::{decode_inbound, forward_events, LineSink};
use ops::LineVehicleOps;
use rov_autopilot::{AutopilotExecutor, Settings};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};

/// Prefix of the daily rolling log files
const LOG_FILE_PREFIX: &str = "rov-bridge.log";

/// Global log file guard (keeps file writer alive)
static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

// =============================================================================
// LOGGING
// =============================================================================

/// Initialize panic handler to log panics through tracing
fn init_panic_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        tracing::error!("PANIC at {}: {}", location, panic_info);
        default_hook(panic_info);
    }));
}

/// Install the global subscriber. Must be called once at startup.
///
/// Console output goes to stderr so stdout carries only the event stream.
/// With a log directory, a daily rolling file is written next to it and
/// files older than `keep_days` are removed.
pub fn init_logging(log_dir: Option<&Path>, keep_days: i64) -> Result<(), BridgeError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    init_panic_handler();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| BridgeError::Logging(e.to_string()))?;
        tracing::info!("ROV bridge initialized (console logging only)");
        return Ok(());
    };

    std::fs::create_dir_all(log_dir)
        .map_err(|e| BridgeError::Logging(format!("cannot create {}: {}", log_dir.display(), e)))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BridgeError::Logging(e.to_string()))?;

    tracing::info!("ROV bridge initialized with file logging");
    tracing::info!("Log file: {}", current_log_file(log_dir).display());

    cleanup_old_logs(log_dir, keep_days);
    Ok(())
}

/// Today's log file in `log_dir`
pub fn current_log_file(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{}.{}", LOG_FILE_PREFIX, today))
}

/// Delete log files older than `keep_days`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, keep_days: i64) -> usize {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(keep_days);

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot read log directory for cleanup: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        // Parse date from filename like "rov-bridge.log.2024-01-15"
        let Some(date_str) = name.strip_prefix(LOG_FILE_PREFIX).and_then(|s| s.strip_prefix('.')) else {
            continue;
        };
        let Ok(file_date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Deleted old log file: {:?}", path);
                    removed += 1;
                }
                Err(e) => tracing::warn!("Failed to delete old log file {:?}: {}", path, e),
            }
        }
    }
    removed
}

// =============================================================================
// TRANSPORT LOOP
// =============================================================================

/// Run the autopilot until `input` reaches end of stream.
///
/// Malformed lines are logged and skipped. End of input is treated as the
/// host going away: the executor shuts down at once, aborting any route
/// still in flight and stopping the vehicle before the function returns.
/// A piped script that wants its route to finish must keep the input open
/// until it has seen `route-completed`.
pub async fn run<R, W>(input: R, output: W, settings: Option<Settings>, event_buffer: usize) -> Result<(), BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let sink = Arc::new(LineSink::new(output));
    let ops = Arc::new(LineVehicleOps::new(sink.clone()));

    let executor = AutopilotExecutor::spawn(ops, settings, event_buffer)?;
    let events = executor.subscribe();
    let forward_sink = sink.clone();
    let forwarder = tokio::spawn(async move { forward_events(events, &forward_sink).await });

    let mut lines = input.lines();
    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(BridgeError::from(e)),
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode_inbound(&line) {
            Ok(message) => {
                tracing::debug!("Inbound {}", message.name());
                if let Err(e) = executor.send(message).await {
                    break Err(e.into());
                }
            }
            Err(e) => tracing::warn!("Ignoring inbound line: {}", e),
        }
    };

    tracing::info!("Input closed, stopping autopilot");
    executor.shutdown().await?;
    if forwarder.await.is_err() {
        tracing::error!("Event forwarder panicked");
    }
    sink.shutdown().await?;
    result
}
