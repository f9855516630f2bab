//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (stdout, JSON or human format)
//! - Optionally mirror events to a rotating log file
//! - Configure log level from `RUST_LOG` or config

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFileConfig, ObservabilityConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    File(#[from] InitError),

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Map the `when` setting to an appender rotation.
pub fn rotation_for(when: &str) -> Rotation {
    match when.to_ascii_uppercase().as_str() {
        "H" => Rotation::HOURLY,
        "M" => Rotation::MINUTELY,
        _ => Rotation::DAILY,
    }
}

fn file_appender(config: &LogFileConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(rotation_for(&config.rotation_when))
        .filename_prefix(config.file_name.clone())
        .max_log_files(config.backup_count.max(1))
        .build(&config.directory)
}

/// Install the global subscriber.
///
/// `crate_name` selects the default filter target. The returned guard must be
/// held for the life of the process when file logging is enabled, otherwise
/// buffered lines are lost.
pub fn init_logging(
    config: &ObservabilityConfig,
    crate_name: &str,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{}={},tower_http=info", crate_name, config.log_level).into()
    });

    let (file_layer, guard) = if config.log_file.enabled {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(&config.log_file)?);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    let json = config.json_logs.then(|| fmt::layer().json());
    let human = (!config.json_logs).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(human)
        .with(file_layer)
        .try_init()?;

    if config.log_file.enabled && config.log_file.rotation_interval != 1 {
        tracing::warn!(
            interval = config.log_file.rotation_interval,
            "Log rotation interval other than 1 is not supported, rotating every period"
        );
    }

    Ok(guard)
}
