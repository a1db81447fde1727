//! Logging setup.
//!
//! Everything in the crate logs through the `log` facade; this module wires
//! the facade to stderr (and optionally a log file) with `fern`.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::path::{Path, PathBuf};

use crate::config::{Config, LoggingConfig};

/// Build the dispatch for the given settings without installing it.
pub fn build_dispatch(config: &LoggingConfig, log_file: Option<&Path>) -> Result<fern::Dispatch> {
    let level: LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("Invalid logging level '{}'", config.level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // SQL statement logging is far too chatty at info
        .level_for("sqlx", LevelFilter::Warn)
        .level_for("sea_orm", LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        let file = fern::log_file(path).with_context(|| format!("Failed to open log file: {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

/// Install the global logger. Call once at startup.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = if config.file_enabled {
        Some(get_log_file_path()?)
    } else {
        None
    };

    if let Some(parent) = log_file.as_deref().and_then(Path::parent) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    build_dispatch(config, log_file.as_deref())?
        .apply()
        .context("Logger already initialized")?;
    Ok(())
}

/// Location of the log file when file logging is enabled.
pub fn get_log_file_path() -> Result<PathBuf> {
    Ok(Config::get_data_dir()?.join("taskmirror.log"))
}
