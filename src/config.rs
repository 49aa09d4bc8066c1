/*!
 * Configuration types for Starfinder
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StarfinderError};

/// Name of the data folder created next to the working directory
pub const DATA_FOLDER_NAME: &str = "EDStarFinderData";

/// Upper bound on the backoff base; the schedule doubles from here
pub const MAX_BACKOFF_FACTOR_SECS: f64 = 60.0;

/// Main configuration for searches, caching and logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarfinderConfig {
    /// Base URL of the EDSM API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Number of retries for transient HTTP failures
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Exponential backoff base in seconds (delays: f, 2f, 4f, ...)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor_secs: f64,

    /// Radius used when none is given
    #[serde(default = "default_radius")]
    pub default_radius: f64,

    /// Radius retried once when the requested radius finds nothing
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius: f64,

    /// Smallest radius accepted from the user
    #[serde(default = "default_min_radius")]
    pub min_radius: f64,

    /// Largest radius accepted from the user
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,

    /// Age after which a cache entry is reported as stale
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Overall deadline for resolve + query + fallback (None = unbounded)
    #[serde(default)]
    pub search_deadline_secs: Option<u64>,

    /// Root folder holding cache/, logs/ and results/
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for StarfinderConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
            backoff_factor_secs: default_backoff_factor(),
            default_radius: default_radius(),
            fallback_radius: default_fallback_radius(),
            min_radius: default_min_radius(),
            max_radius: default_max_radius(),
            cache_ttl_secs: default_cache_ttl(),
            search_deadline_secs: None,
            data_dir: default_data_dir(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// Default value functions for serde
fn default_api_base_url() -> String {
    "https://www.edsm.net".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    0.5
}

fn default_radius() -> f64 {
    4.0
}

fn default_fallback_radius() -> f64 {
    16.0
}

fn default_min_radius() -> f64 {
    4.0
}

fn default_max_radius() -> f64 {
    40.0
}

fn default_cache_ttl() -> u64 {
    86_400 // 1 day
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DATA_FOLDER_NAME)
}

impl StarfinderConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| StarfinderError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StarfinderError::Config(format!("Failed to encode config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from `path` if given, else from the per-user config file when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    /// Create the data folder and its cache/logs/results subfolders
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.cache_dir(),
            self.logs_dir(),
            self.results_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_deadline(&self) -> Option<Duration> {
        self.search_deadline_secs.map(Duration::from_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Reject a user-supplied radius outside `[min_radius, max_radius]`
    pub fn validate_radius(&self, radius: f64) -> Result<f64> {
        if !radius.is_finite() || radius < self.min_radius || radius > self.max_radius {
            return Err(StarfinderError::InvalidRadius {
                radius,
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        Ok(radius)
    }

    /// Check internal consistency after loading
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("min_radius", self.min_radius),
            ("max_radius", self.max_radius),
            ("default_radius", self.default_radius),
            ("fallback_radius", self.fallback_radius),
        ] {
            if !value.is_finite() {
                return Err(StarfinderError::Config(format!(
                    "{} must be a finite number, got {}",
                    key, value
                )));
            }
        }
        if self.min_radius <= 0.0 || self.min_radius > self.max_radius {
            return Err(StarfinderError::Config(format!(
                "min_radius ({}) must be positive and not exceed max_radius ({})",
                self.min_radius, self.max_radius
            )));
        }
        if self.fallback_radius <= 0.0 {
            return Err(StarfinderError::Config(
                "fallback_radius must be positive".to_string(),
            ));
        }
        if !(0.0..=MAX_BACKOFF_FACTOR_SECS).contains(&self.backoff_factor_secs) {
            return Err(StarfinderError::Config(format!(
                "backoff_factor_secs must be between 0 and {}, got {}",
                MAX_BACKOFF_FACTOR_SECS, self.backoff_factor_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(StarfinderError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.api_base_url).map_err(|e| {
            StarfinderError::Config(format!("Invalid api_base_url '{}': {}", self.api_base_url, e))
        })?;
        Ok(())
    }

    /// Set a single field by its TOML key, as used by `starfinder config set`
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse()
                .map_err(|_| StarfinderError::Config(format!("Invalid value for {}: {}", key, value)))
        }

        match key {
            "api_base_url" => self.api_base_url = value.to_string(),
            "request_timeout_secs" => self.request_timeout_secs = parse(key, value)?,
            "retry_attempts" => self.retry_attempts = parse(key, value)?,
            "backoff_factor_secs" => self.backoff_factor_secs = parse(key, value)?,
            "default_radius" => self.default_radius = parse(key, value)?,
            "fallback_radius" => self.fallback_radius = parse(key, value)?,
            "min_radius" => self.min_radius = parse(key, value)?,
            "max_radius" => self.max_radius = parse(key, value)?,
            "cache_ttl_secs" => self.cache_ttl_secs = parse(key, value)?,
            "search_deadline_secs" => {
                self.search_deadline_secs = match value {
                    "" | "none" => None,
                    v => Some(parse(key, v)?),
                }
            }
            "data_dir" => self.data_dir = PathBuf::from(value),
            "log_level" => self.log_level = parse(key, value)?,
            "verbose" => self.verbose = parse(key, value)?,
            other => {
                return Err(StarfinderError::Config(format!(
                    "Unknown configuration key: {}",
                    other
                )))
            }
        }
        self.validate()
    }
}

/// Per-user config file location (`<config dir>/starfinder/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("starfinder").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = StarfinderConfig::default();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.backoff_factor_secs, 0.5);
        assert_eq!(config.fallback_radius, 16.0);
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert!(config.search_deadline_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_data_subdirectories() {
        let config = StarfinderConfig {
            data_dir: PathBuf::from("/data"),
            ..Default::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/data/cache"));
        assert_eq!(config.logs_dir(), PathBuf::from("/data/logs"));
        assert_eq!(config.results_dir(), PathBuf::from("/data/results"));
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let dir = tempdir().unwrap();
        let config = StarfinderConfig {
            data_dir: dir.path().join("EDStarFinderData"),
            ..Default::default()
        };
        config.ensure_dirs().unwrap();
        assert!(config.cache_dir().is_dir());
        assert!(config.logs_dir().is_dir());
        assert!(config.results_dir().is_dir());
    }

    #[test]
    fn test_radius_validation() {
        let config = StarfinderConfig::default();
        assert_eq!(config.validate_radius(4.0).unwrap(), 4.0);
        assert_eq!(config.validate_radius(40.0).unwrap(), 40.0);
        assert!(config.validate_radius(3.9).is_err());
        assert!(config.validate_radius(41.0).is_err());
        assert!(config.validate_radius(f64::NAN).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = StarfinderConfig {
            retry_attempts: 5,
            search_deadline_secs: Some(30),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        let loaded = StarfinderConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
retry_attempts = 2
fallback_radius = 20.0
log_level = "debug"
"#;
        let config: StarfinderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.fallback_radius, 20.0);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.api_base_url, "https://www.edsm.net");
    }

    #[test]
    fn test_set_value() {
        let mut config = StarfinderConfig::default();
        config.set_value("retry_attempts", "7").unwrap();
        config.set_value("log_level", "TRACE").unwrap();
        config.set_value("search_deadline_secs", "45").unwrap();
        assert_eq!(config.retry_attempts, 7);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.search_deadline_secs, Some(45));

        config.set_value("search_deadline_secs", "none").unwrap();
        assert_eq!(config.search_deadline_secs, None);

        assert!(config.set_value("retry_attempts", "many").is_err());
        assert!(config.set_value("no_such_key", "1").is_err());
        assert!(config.set_value("api_base_url", "not a url").is_err());
    }

    #[test]
    fn test_rejects_unusable_numbers() {
        for (key, value) in [
            ("backoff_factor_secs", "1e30"),
            ("backoff_factor_secs", "-1"),
            ("fallback_radius", "NaN"),
            ("max_radius", "inf"),
        ] {
            let mut config = StarfinderConfig::default();
            assert!(config.set_value(key, value).is_err(), "{} = {}", key, value);
        }
        StarfinderConfig::default()
            .set_value("backoff_factor_secs", "60")
            .unwrap();

        let config = StarfinderConfig {
            backoff_factor_secs: 1e30,
            ..Default::default()
        };
        let err = crate::core::http::RetryPolicy::from_config(&config).unwrap_err();
        assert!(matches!(err, StarfinderError::Config(_)));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
