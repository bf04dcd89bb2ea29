// src/config/options.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::data::KeyShape;
use crate::engine::types::{CalibrationStrategy, Timing};
use crate::error::{Error, Result};
use crate::store::RetryPolicy;

/// Startup configuration. Field names on disk follow the `config.json`
/// the collector has always read (`TARGET_URL`, `POLLING_INTERVAL`, ...).
/// Keys this crate does not know (credentials, browser channel) are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub target_url: String,
    pub competitions: Vec<String>,
    /// Items opened per incremental pass; 0 means no cap.
    pub max_matches: usize,
    /// Jitter bounds in seconds.
    pub delay_min: f64,
    pub delay_max: f64,
    /// Seconds between polling passes.
    pub polling_interval: u64,
    /// Empty outcomes tolerated in one incremental pass before it is aborted.
    pub consecutive_none_limit: u32,
    /// Seconds to rest after an aborted pass.
    pub rest_time: u64,
    pub lookback_hours: u32,

    pub history_dir: PathBuf,
    pub anchor_dir: PathBuf,
    pub key_shape: KeyShape,
    pub calibration: CalibrationStrategy,
    pub nav_retry_limit: u32,
    /// Seconds between navigation attempts.
    pub nav_backoff: u64,
    /// Seconds to pause once `NAV_RETRY_LIMIT` navigations failed in a row.
    pub nav_cooldown: u64,
    /// Seconds to wait before re-navigating after the list view was lost.
    pub error_delay: u64,
    pub write_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: TARGET_URL.to_string(),
            competitions: DEFAULT_COMPETITIONS.iter().map(|c| c.to_string()).collect(),
            max_matches: MAX_MATCHES,
            delay_min: DELAY_MIN_SECS,
            delay_max: DELAY_MAX_SECS,
            polling_interval: POLLING_INTERVAL_SECS,
            consecutive_none_limit: CONSECUTIVE_NONE_LIMIT,
            rest_time: REST_TIME_SECS,
            lookback_hours: LOOKBACK_HOURS,
            history_dir: PathBuf::from(HISTORY_DIR),
            anchor_dir: PathBuf::from(ANCHOR_DIR),
            key_shape: KeyShape::default(),
            calibration: CalibrationStrategy::default(),
            nav_retry_limit: NAV_RETRY_LIMIT,
            nav_backoff: NAV_BACKOFF_SECS,
            nav_cooldown: NAV_COOLDOWN_SECS,
            error_delay: ERROR_DELAY_SECS,
            write_attempts: WRITE_ATTEMPTS,
            retry_delay_ms: RETRY_DELAY_MS,
        }
    }
}

impl Config {
    /// Read `path`, falling back to defaults when the file does not exist.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            logf!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_json(&text).map_err(|e| match e {
            Error::Json { source, .. } => Error::Json { path: path.to_path_buf(), source },
            other => other,
        })?;
        logf!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parse, normalize and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(text).map_err(|source| Error::Json {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Fix known competition-name typos and drop blank or repeated entries.
    pub fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.competitions.len());
        for name in self.competitions.drain(..) {
            let name = name.trim();
            let name = COMPETITION_ALIASES
                .iter()
                .find(|(typo, _)| *typo == name)
                .map(|(_, fixed)| *fixed)
                .unwrap_or(name);
            if !name.is_empty() && !seen.iter().any(|s: &String| s == name) {
                seen.push(name.to_string());
            }
        }
        self.competitions = seen;
    }

    pub fn validate(&self) -> Result<()> {
        if self.competitions.is_empty() {
            return Err(Error::Config("COMPETITIONS must list at least one competition".into()));
        }
        if self.target_url.trim().is_empty() {
            return Err(Error::Config("TARGET_URL is empty".into()));
        }
        if !(self.delay_min.is_finite() && self.delay_max.is_finite()) || self.delay_min < 0.0 {
            return Err(Error::Config("DELAY_MIN/DELAY_MAX must be finite and non-negative".into()));
        }
        if self.delay_min > self.delay_max {
            return Err(Error::Config(format!(
                "DELAY_MIN ({}) is larger than DELAY_MAX ({})",
                self.delay_min, self.delay_max
            )));
        }
        if self.consecutive_none_limit == 0 {
            return Err(Error::Config("CONSECUTIVE_NONE_LIMIT must be at least 1".into()));
        }
        if self.nav_retry_limit == 0 {
            return Err(Error::Config("NAV_RETRY_LIMIT must be at least 1".into()));
        }
        if self.write_attempts == 0 {
            return Err(Error::Config("WRITE_ATTEMPTS must be at least 1".into()));
        }
        if self.lookback_hours > 24 {
            return Err(Error::Config("LOOKBACK_HOURS cannot exceed 24".into()));
        }
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            polling_interval: Duration::from_secs(self.polling_interval),
            rest_interval: Duration::from_secs(self.rest_time),
            nav_backoff: Duration::from_secs(self.nav_backoff),
            nav_cooldown: Duration::from_secs(self.nav_cooldown),
            error_delay: Duration::from_secs(self.error_delay),
            jitter_min: Duration::from_secs_f64(self.delay_min),
            jitter_max: Duration::from_secs_f64(self.delay_max),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.write_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}
