//! Logger initialization.
//!
//! The terminal belongs to the TUI, so log output goes to a file under the
//! data directory. `RUST_LOG` takes precedence over the configured level.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Initialize the global logger writing to `path`. Without a path, logs are discarded.
pub fn initialize(log_config: &LogConfig, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let writer = Mutex::new(file);

    match log_config.format {
        LogFormat::Plain => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("logger already initialized")?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer().json().with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("logger already initialized")?;
        }
    }

    Ok(())
}
