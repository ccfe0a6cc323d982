//! Tracing-based logger initialization.

use std::io;

use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::domain::models::{LogConfig, LogFormat, RotationPolicy};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
}

/// Holds the tracing-appender worker guard alive for the process
/// lifetime; dropping it flushes the non-blocking file writer.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Initialize the global tracing subscriber from a [`LogConfig`].
    /// Safe to call once per process; a second call observes tracing's
    /// own "already set" error, which this treats as a no-op success
    /// since it only happens in tests that share a process.
    pub fn init(config: &LogConfig) -> Result<Self, LoggingError> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = match config.rotation {
                RotationPolicy::Daily => rolling::daily(log_dir, "conclave.log"),
                RotationPolicy::Hourly => rolling::hourly(log_dir, "conclave.log"),
                RotationPolicy::Never => rolling::never(log_dir, "conclave.log"),
            };
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter.clone());

            if config.enable_stdout {
                let _ = tracing_subscriber::registry().with(file_layer).with(stdout_layer(config.format, env_filter)).try_init();
            } else {
                let _ = tracing_subscriber::registry().with(file_layer).try_init();
            }
            Some(guard)
        } else {
            let _ = tracing_subscriber::registry().with(stdout_layer(config.format, env_filter)).try_init();
            None
        };

        tracing::info!(level = %config.level, format = ?config.format, file_output = config.log_dir.is_some(), "logger initialized");
        Ok(Self { _guard: guard })
    }
}

fn stdout_layer<S>(
    format: LogFormat,
    env_filter: EnvFilter,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter),
        ),
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stdout)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter),
        ),
    }
}

fn parse_log_level(level: &str) -> Result<Level, LoggingError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(LoggingError::InvalidLevel(other.to_string())),
    }
}
