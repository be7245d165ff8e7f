//! Logging initialization.
//!
//! The dashboard owns the terminal, so log lines go to a file in the data
//! directory instead of stdout.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_FILENAME: &str = "workload.log";

pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILENAME);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("workload={}", config.level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        let layer = fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_current_span(true)
            .with_target(true);
        registry
            .with(layer)
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        let layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true);
        registry
            .with(layer)
            .try_init()
            .context("Failed to install log subscriber")?;
    }
    Ok(())
}
