use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Timing configuration for the engine. The defaults reproduce the reference
/// game's constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How far ahead of "now" the scheduler pre-schedules beats.
    pub lookahead_horizon_secs: f64,
    /// Period of the scheduler's recurring tick.
    pub poll_interval_ms: u64,
    /// Period of the render/input/sweep loop.
    pub frame_interval_ms: u64,
    /// Delay between `start` and the first beat.
    pub preroll_secs: f64,
    pub windows: JudgmentWindows,
    /// Chance that a generated beat is moved to a random lane.
    pub lane_override_probability: f64,
    /// Capacity of the bounded queue feeding the audio backend.
    pub audio_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead_horizon_secs: 0.1,
            poll_interval_ms: 25,
            frame_interval_ms: 16,
            preroll_secs: 0.5,
            windows: JudgmentWindows::default(),
            lane_override_probability: 0.2,
            audio_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file. Missing fields fall back to the
    /// defaults; the result is validated before it is returned.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lookahead_horizon_secs.is_finite() && self.lookahead_horizon_secs > 0.0) {
            return Err(EngineError::config(
                "lookahead_horizon_secs",
                "must be a positive number of seconds",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::config("poll_interval_ms", "must be non-zero"));
        }
        if self.frame_interval_ms == 0 {
            return Err(EngineError::config("frame_interval_ms", "must be non-zero"));
        }
        if !(self.preroll_secs.is_finite() && self.preroll_secs >= 0.0) {
            return Err(EngineError::config("preroll_secs", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.lane_override_probability) {
            return Err(EngineError::config(
                "lane_override_probability",
                "must lie within [0, 1]",
            ));
        }
        if self.audio_queue_capacity == 0 {
            return Err(EngineError::config("audio_queue_capacity", "must be non-zero"));
        }
        self.windows.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Hit windows in milliseconds, measured as the absolute distance between the
/// press and the note's target time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentWindows {
    pub perfect_ms: f64,
    pub great_ms: f64,
    pub good_ms: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self {
            perfect_ms: 50.0,
            great_ms: 100.0,
            good_ms: 150.0,
        }
    }
}

impl JudgmentWindows {
    /// The widest window in seconds. Notes older than this are misses.
    pub fn good_secs(&self) -> f64 {
        self.good_ms / 1000.0
    }

    fn validate(&self) -> Result<()> {
        if !(self.perfect_ms.is_finite() && self.perfect_ms > 0.0) {
            return Err(EngineError::config("windows.perfect_ms", "must be positive"));
        }
        if !(self.great_ms.is_finite() && self.great_ms >= self.perfect_ms) {
            return Err(EngineError::config(
                "windows.great_ms",
                "must not be narrower than the perfect window",
            ));
        }
        if !(self.good_ms.is_finite() && self.good_ms >= self.great_ms) {
            return Err(EngineError::config(
                "windows.good_ms",
                "must not be narrower than the great window",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert_eq!(config.windows.good_secs(), 0.15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "poll_interval_ms": 10 }"#).unwrap();
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.windows, JudgmentWindows::default());
    }

    #[test]
    fn rejects_inverted_windows() {
        let config = EngineConfig {
            windows: JudgmentWindows {
                perfect_ms: 50.0,
                great_ms: 40.0,
                good_ms: 150.0,
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("windows.great_ms"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = EngineConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "poll_interval_ms", .. })
        ));
    }
}
