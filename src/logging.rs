//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and, in addition, to a file. When
//! `DOCRAG_LOG_FILE` is set, logs are appended to that path; otherwise a file logger is created
//! under `logs/docrag.log`. The file layer writes through a non-blocking appender.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_DIRECTORY: &str = "logs";
const LOG_FILE_NAME: &str = "docrag.log";

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the log file can be opened, a file layer.
/// - Keeps the appender guard in a global so buffered lines are flushed for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    match std::env::var("DOCRAG_LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                Ok(file) => Some(install_writer(file)),
                Err(err) => {
                    eprintln!("Failed to open log file {path}: {err}");
                    None
                }
            }
        }
        _ => {
            if let Err(err) = std::fs::create_dir_all(LOG_DIRECTORY) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let appender = tracing_appender::rolling::never(LOG_DIRECTORY, LOG_FILE_NAME);
            Some(install_writer(appender))
        }
    }
}

fn install_writer<W>(writer: W) -> NonBlocking
where
    W: std::io::Write + Send + 'static,
{
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);
    let _ = LOG_GUARD.set(guard);
    non_blocking
}
