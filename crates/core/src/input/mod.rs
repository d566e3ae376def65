use serde::{Deserialize, Serialize};

use crate::{beat::LANE_COUNT, Lane};

/// An edge-triggered press on a lane, stamped with the engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneInput {
    pub lane: Lane,
    pub observed_at: f64,
}

/// Turns raw key-down/key-up streams into edge-triggered presses by
/// swallowing auto-repeat while a lane is held.
#[derive(Debug, Default, Clone)]
pub struct PressFilter {
    held: [bool; LANE_COUNT as usize],
}

impl PressFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the press to forward, or `None` for a repeat.
    pub fn key_down(&mut self, lane: Lane, observed_at: f64) -> Option<LaneInput> {
        let held = &mut self.held[usize::from(lane.index())];
        if *held {
            return None;
        }
        *held = true;
        Some(LaneInput { lane, observed_at })
    }

    pub fn key_up(&mut self, lane: Lane) {
        self.held[usize::from(lane.index())] = false;
    }

    pub fn is_held(&self, lane: Lane) -> bool {
        self.held[usize::from(lane.index())]
    }
}
