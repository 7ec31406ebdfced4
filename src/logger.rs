use std::fmt;
use std::path::Path;

use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self as tracing_fmt, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

#[derive(Debug)]
pub enum LoggerError {
    CreateLogDirFail(std::io::Error),
    InvalidFilter(String),
    AlreadyInitialized(String),
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::CreateLogDirFail(e) => write!(f, "cannot create log directory: {}", e),
            LoggerError::InvalidFilter(e) => write!(f, "invalid log filter: {}", e),
            LoggerError::AlreadyInitialized(e) => write!(f, "logger already initialized: {}", e),
        }
    }
}

impl std::error::Error for LoggerError {}

/// Installs the global subscriber.
///
/// Diagnostics go to stderr; with `log_dir` set they are also appended to a
/// daily-rotated `server.log` there. `RUST_LOG` overrides the `info` default.
pub fn init_logger(log_dir: Option<&Path>) -> Result<(), LoggerError> {
    let console_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(LoggerError::CreateLogDirFail)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "server.log");
            Some(
                tracing_fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_ansi(false)
                    .with_writer(file_appender),
            )
        }
        None => None,
    };

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    match log_dir {
        Some(dir) => info!("Logger initialized, writing to {}", dir.display()),
        None => info!("Logger initialized"),
    }
    Ok(())
}
