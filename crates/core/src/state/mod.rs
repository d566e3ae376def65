//! Score, combo, multiplier and health for a single run.
//!
//! All mutation goes through [`RunState::apply_hit`] and
//! [`RunState::apply_misses`], and both are ignored unless the run is
//! [`RunStatus::Running`].

use serde::{Deserialize, Serialize};

use crate::Tier;

pub const MAX_HEALTH: f64 = 100.0;
pub const MAX_MULTIPLIER: u32 = 8;
/// Combo needed per multiplier step.
pub const COMBO_PER_STEP: u32 = 10;
pub const MISS_DAMAGE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Ended,
}

/// Per-tier hit counts and misses over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub missed: u32,
}

impl Tally {
    pub fn hits(&self) -> u32 {
        self.perfect + self.great + self.good
    }

    fn record_hit(&mut self, tier: Tier) {
        match tier {
            Tier::Perfect => self.perfect += 1,
            Tier::Great => self.great += 1,
            Tier::Good => self.good += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub multiplier: u32,
    pub health: f64,
    pub status: RunStatus,
    pub tally: Tally,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1,
            health: MAX_HEALTH,
            status: RunStatus::Idle,
            tally: Tally::default(),
        }
    }
}

/// Multiplier for a given combo: one step per ten hits, capped.
pub fn multiplier_for(combo: u32) -> u32 {
    (1 + combo / COMBO_PER_STEP).min(MAX_MULTIPLIER)
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Enters `Running` with fresh counters and full health.
    pub fn start(&mut self) {
        *self = Self {
            status: RunStatus::Running,
            ..Self::default()
        };
    }

    /// Returns to `Idle`, the only way out of `Ended`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Scores a hit and returns the points awarded.
    pub fn apply_hit(&mut self, tier: Tier) -> u64 {
        if !self.is_running() {
            return 0;
        }
        let points = tier.points() * u64::from(self.multiplier);
        self.score += points;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.multiplier = multiplier_for(self.combo);
        self.health = (self.health + tier.health_bonus()).clamp(0.0, MAX_HEALTH);
        self.tally.record_hit(tier);
        points
    }

    /// Applies `count` simultaneous misses. Returns `true` if this ended the
    /// run.
    pub fn apply_misses(&mut self, count: u32) -> bool {
        if count == 0 || !self.is_running() {
            return false;
        }
        self.tally.missed += count;
        self.health -= MISS_DAMAGE * f64::from(count);
        if self.health <= 0.0 {
            self.health = 0.0;
            self.status = RunStatus::Ended;
            return true;
        }
        self.health = self.health.min(MAX_HEALTH);
        self.combo = 0;
        self.multiplier = 1;
        false
    }
}
