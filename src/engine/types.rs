// src/engine/types.rs
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::data::{KeyShape, MatchKey};
use crate::core::time::parse_label;
use crate::driver::VisibleItem;
use crate::error::Result;

/// How a worker finds its anchor when today has none stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStrategy {
    /// Open items newest-first until one has a result.
    #[default]
    Scan,
    /// Take the latest slot already in today's table; scan if there is none.
    FromTable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Navigating,
    NeedsCalibration,
    LookbackBackfill { anchor: u32 },
    Incremental,
    Stopped,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Navigating => f.write_str("navigating"),
            State::NeedsCalibration => f.write_str("needs-calibration"),
            State::LookbackBackfill { .. } => f.write_str("lookback"),
            State::Incremental => f.write_str("incremental"),
            State::Stopped => f.write_str("stopped"),
        }
    }
}

/// Result of one `step()`: where to go, and how long to wait first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: State,
    pub delay: Duration,
}

impl Transition {
    pub fn now(next: State) -> Self {
        Self { next, delay: Duration::ZERO }
    }

    pub fn after(next: State, delay: Duration) -> Self {
        Self { next, delay }
    }
}

/// Waits the worker observes between actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub polling_interval: Duration,
    pub rest_interval: Duration,
    pub nav_backoff: Duration,
    pub nav_cooldown: Duration,
    pub error_delay: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Timing {
    /// No waiting at all.
    pub fn immediate() -> Self {
        Self {
            polling_interval: Duration::ZERO,
            rest_interval: Duration::ZERO,
            nav_backoff: Duration::ZERO,
            nav_cooldown: Duration::ZERO,
            error_delay: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }
}

/// Everything a worker needs from the configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub target_url: String,
    pub lookback_hours: u32,
    pub consecutive_empty_limit: u32,
    /// 0 = unlimited
    pub max_matches: usize,
    pub nav_retry_limit: u32,
    pub key_shape: KeyShape,
    pub calibration: CalibrationStrategy,
    pub timing: Timing,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_url: config.target_url.clone(),
            lookback_hours: config.lookback_hours,
            consecutive_empty_limit: config.consecutive_none_limit.max(1),
            max_matches: config.max_matches,
            nav_retry_limit: config.nav_retry_limit.max(1),
            key_shape: config.key_shape,
            calibration: config.calibration,
            timing: config.timing(),
        }
    }
}

/// A visible item with its parsed time slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub minutes: u32,
    pub item: VisibleItem,
}

impl Slot {
    /// Attach the parsed time slot to a list item.
    pub fn from_item(item: &VisibleItem) -> Result<Self> {
        let minutes = parse_label(&item.time_label)?;
        Ok(Self { minutes, item: item.clone() })
    }

    pub fn key(&self, competition: &str, shape: KeyShape) -> MatchKey {
        MatchKey::new(competition, self.minutes, self.item.teams.clone()).for_shape(shape)
    }
}

/// Counters for one calibration, lookback or incremental pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub opened: usize,
    pub stored: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
}
