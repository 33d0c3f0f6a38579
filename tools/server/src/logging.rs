//! Console and daily file logging.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// The returned guards flush the writers and must live until exit.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Vec<WorkerGuard>> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.directory.display()
        )
    })?;

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(stdout_writer)
        .with_filter(filter());

    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_filter(filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(filter())
            .boxed()
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(vec![stdout_guard, file_guard])
}

/// Remove every file in the log directory. A missing directory is fine.
pub fn clear_logs(directory: &Path) -> Result<usize> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", directory.display()))
        }
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
