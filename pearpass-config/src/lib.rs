//! Configuration for the job queue subsystem.
//!
//! All the fixed delays and thresholds the queue relies on are product
//! tunables, not structural constants, so they live here: the guard-wait
//! timeout, the post-resume settle delay, the auto-lock safety threshold and
//! the retry ceiling. Values come from an optional TOML file (path in
//! `PEARPASS_CONFIG`) with environment overrides on top.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod tracing_setup;

pub use tracing_setup::install_tracing;

/// Raw, fully optional file representation.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub job_queue: Option<JobQueueSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQueueSection {
    #[serde(default)]
    pub storage_dir: Option<String>,
    #[serde(default)]
    pub shared_container: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub guard_wait_timeout_ms: Option<u64>,
    #[serde(default)]
    pub post_resume_delay_ms: Option<u64>,
    #[serde(default)]
    pub safety_threshold_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Concrete job queue configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobQueueConfig {
    /// Explicit override of the job storage root; normally resolved from
    /// the platform containers at runtime.
    pub storage_dir: Option<PathBuf>,
    /// Shared app-group container visible to both processes, when one exists.
    pub shared_container: Option<PathBuf>,
    pub max_retries: u32,
    pub guard_wait_timeout: Duration,
    pub post_resume_delay: Duration,
    pub safety_threshold: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            shared_container: None,
            max_retries: 3,
            guard_wait_timeout: Duration::from_secs(10),
            post_resume_delay: Duration::from_millis(500),
            safety_threshold: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub job_queue: JobQueueConfig,
    pub logging: LoggingConfig,
}

/// Load a raw config file from a TOML path.
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let s = fs::read_to_string(path)?;
    toml::from_str(&s).map_err(|e| ConfigError::Parse(e.to_string()))
}

impl Config {
    /// Build the configuration from `PEARPASS_CONFIG` (when set) plus
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = match env::var("PEARPASS_CONFIG") {
            Ok(path) if !path.is_empty() => load_raw_from_file(path)?,
            _ => RawConfigFile::default(),
        };
        Self::from_raw(raw)
    }

    /// Merge a raw file over the defaults, apply env overrides, validate.
    pub fn from_raw(raw: RawConfigFile) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();

        if let Some(jq) = raw.job_queue {
            if let Some(dir) = jq.storage_dir {
                cfg.job_queue.storage_dir = Some(PathBuf::from(dir));
            }
            if let Some(dir) = jq.shared_container {
                cfg.job_queue.shared_container = Some(PathBuf::from(dir));
            }
            if let Some(n) = jq.max_retries {
                cfg.job_queue.max_retries = n;
            }
            if let Some(ms) = jq.guard_wait_timeout_ms {
                cfg.job_queue.guard_wait_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = jq.post_resume_delay_ms {
                cfg.job_queue.post_resume_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = jq.safety_threshold_ms {
                cfg.job_queue.safety_threshold = Duration::from_millis(ms);
            }
        }

        if let Some(logging) = raw.logging {
            if let Some(level) = logging.level {
                cfg.logging.level = level;
            }
            if let Some(json) = logging.json {
                cfg.logging.json = json;
            }
        }

        if let Ok(dir) = env::var("PEARPASS_JOBS_DIR") {
            if !dir.is_empty() {
                cfg.job_queue.storage_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(level) = env::var("PEARPASS_LOG_LEVEL") {
            if !level.is_empty() {
                cfg.logging.level = level;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.job_queue.max_retries == 0 {
            return Err(ConfigError::Validation(
                "job_queue.max_retries must be at least 1".into(),
            ));
        }
        if self.job_queue.guard_wait_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "job_queue.guard_wait_timeout_ms must be positive".into(),
            ));
        }
        if self.job_queue.safety_threshold.is_zero() {
            return Err(ConfigError::Validation(
                "job_queue.safety_threshold_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_product_tunables() {
        let cfg = Config::default();
        assert_eq!(cfg.job_queue.max_retries, 3);
        assert_eq!(cfg.job_queue.guard_wait_timeout, Duration::from_secs(10));
        assert_eq!(cfg.job_queue.post_resume_delay, Duration::from_millis(500));
        assert_eq!(cfg.job_queue.safety_threshold, Duration::from_millis(1000));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[job_queue]
storage_dir = "/var/pearpass/jobs"
max_retries = 5
guard_wait_timeout_ms = 2000

[logging]
level = "debug"
json = true
"#
        )
        .unwrap();

        let raw = load_raw_from_file(file.path()).unwrap();
        let cfg = Config::from_raw(raw).unwrap();

        assert_eq!(
            cfg.job_queue.storage_dir.as_deref(),
            Some(Path::new("/var/pearpass/jobs"))
        );
        assert_eq!(cfg.job_queue.max_retries, 5);
        assert_eq!(cfg.job_queue.guard_wait_timeout, Duration::from_secs(2));
        // Untouched values keep their defaults.
        assert_eq!(cfg.job_queue.post_resume_delay, Duration::from_millis(500));
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn zero_retries_is_rejected() {
        let raw: RawConfigFile = toml::from_str("[job_queue]\nmax_retries = 0\n").unwrap();
        assert!(matches!(
            Config::from_raw(raw),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [").unwrap();
        assert!(matches!(
            load_raw_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
