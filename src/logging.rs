/*!
 * Diagnostic logging
 *
 * `tracing` output goes to stderr in compact form, or as JSON lines to the
 * file named by `log_file`. This is separate from the operation log in
 * `oplog`, which is always written.
 */

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::StarfinderConfig;
use crate::error::{Result, StarfinderError};

/// Where diagnostics are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Compact text on stderr, leaving stdout to `--json`
    Stderr,
    /// JSON lines appended to a file
    File(PathBuf),
}

impl LogTarget {
    pub fn from_config(config: &StarfinderConfig) -> Self {
        match config.log_file {
            Some(ref path) => LogTarget::File(path.clone()),
            None => LogTarget::Stderr,
        }
    }
}

/// Effective level: `verbose` wins over `log_level`
pub fn effective_level(config: &StarfinderConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter directives used when `RUST_LOG` is unset. The HTTP stack is held
/// at warn so debug runs show our retries, not connection pool chatter.
pub fn default_directives(level: Level) -> String {
    format!("starfinder={},reqwest=warn,hyper=warn,hyper_util=warn", level)
}

fn log_filter(config: &StarfinderConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(effective_level(config))))
        .map_err(|e| StarfinderError::Config(format!("Failed to create log filter: {}", e)))
}

/// Open `path` for appending, creating missing parent folders
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            StarfinderError::Config(format!(
                "Failed to open log file {}: {}",
                path.display(),
                e
            ))
        })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &StarfinderConfig) -> Result<()> {
    let filter = log_filter(config)?;

    let (stderr_layer, file_layer) = match LogTarget::from_config(config) {
        LogTarget::Stderr => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            ),
            None,
        ),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            let layer = fmt::layer()
                .with_writer(file)
                .with_thread_names(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(false)
                .json();
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| StarfinderError::Config(format!("Failed to install logger: {}", e)))
}

/// Route `tracing` output to the test harness, once per process
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(Level::DEBUG)));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer().with_target(false).compact())
            .try_init()
            .ok();
    });
}
