use serde::{Deserialize, Serialize};

use crate::{JudgmentWindows, Lane, Note, NoteTimeline, Resolution};

/// Accuracy bucket for a successful hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Perfect,
    Great,
    Good,
}

impl Tier {
    /// Base points before the combo multiplier.
    pub fn points(self) -> u64 {
        match self {
            Self::Perfect => 300,
            Self::Great => 100,
            Self::Good => 50,
        }
    }

    pub fn health_bonus(self) -> f64 {
        match self {
            Self::Perfect => 5.0,
            Self::Great | Self::Good => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Hit {
        tier: Tier,
        /// The resolved note, already removed from the timeline.
        note: Note,
        /// Signed timing error; negative means the press was early.
        offset_ms: f64,
    },
    /// No live note on the lane within the widest window. Not penalised.
    NoMatch,
}

impl Outcome {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Hit { tier, .. } => Some(*tier),
            Self::NoMatch => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Matches lane presses against the live notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JudgmentEngine {
    windows: JudgmentWindows,
}

impl JudgmentEngine {
    pub fn new(windows: JudgmentWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &JudgmentWindows {
        &self.windows
    }

    /// Buckets an absolute timing error. `None` means outside every window.
    pub fn classify(&self, delta_ms: f64) -> Option<Tier> {
        if delta_ms > self.windows.good_ms {
            None
        } else if delta_ms <= self.windows.perfect_ms {
            Some(Tier::Perfect)
        } else if delta_ms <= self.windows.great_ms {
            Some(Tier::Great)
        } else {
            Some(Tier::Good)
        }
    }

    /// Judges a press on `lane` at `now`. On a hit the nearest note is removed
    /// from `timeline`; otherwise the timeline is untouched.
    pub fn judge(&self, timeline: &mut NoteTimeline, lane: Lane, now: f64) -> Outcome {
        let Some((id, delta)) = timeline.nearest_on_lane(lane, now) else {
            return Outcome::NoMatch;
        };
        let Some(tier) = self.classify(delta * 1000.0) else {
            return Outcome::NoMatch;
        };
        match timeline.resolve(id, Resolution::Hit(tier)) {
            Some(note) => Outcome::Hit {
                tier,
                note,
                offset_ms: (now - note.target_time) * 1000.0,
            },
            None => Outcome::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(index: u8) -> Lane {
        Lane::new(index).unwrap()
    }

    fn judge_single(now: f64) -> Outcome {
        let mut timeline = NoteTimeline::new();
        timeline.spawn(lane(0), 10.0);
        JudgmentEngine::default().judge(&mut timeline, lane(0), now)
    }

    #[test]
    fn tiers_follow_timing_error() {
        assert_eq!(judge_single(10.040).tier(), Some(Tier::Perfect));
        assert_eq!(judge_single(10.080).tier(), Some(Tier::Great));
        assert_eq!(judge_single(10.140).tier(), Some(Tier::Good));
        assert_eq!(judge_single(10.200), Outcome::NoMatch);
    }

    #[test]
    fn early_presses_are_judged_symmetrically() {
        assert_eq!(judge_single(9.960).tier(), Some(Tier::Perfect));
        assert_eq!(judge_single(9.860).tier(), Some(Tier::Good));
        match judge_single(9.970) {
            Outcome::Hit { offset_ms, .. } => assert!(offset_ms < 0.0),
            Outcome::NoMatch => panic!("expected a hit"),
        }
    }

    #[test]
    fn selects_nearest_of_several_notes() {
        let mut timeline = NoteTimeline::new();
        timeline.spawn(lane(1), 10.0);
        let expected = timeline.spawn(lane(1), 10.05);
        timeline.spawn(lane(1), 10.09);

        let outcome = JudgmentEngine::default().judge(&mut timeline, lane(1), 10.06);
        match outcome {
            Outcome::Hit { note, tier, .. } => {
                assert_eq!(note.id, expected);
                assert_eq!(tier, Tier::Perfect);
                assert_eq!(note.resolution, Resolution::Hit(Tier::Perfect));
            }
            Outcome::NoMatch => panic!("expected a hit"),
        }
        assert_eq!(timeline.len(), 2);
        assert!(timeline.get(expected).is_none());
    }

    #[test]
    fn stray_press_leaves_timeline_untouched() {
        let mut timeline = NoteTimeline::new();
        let id = timeline.spawn(lane(0), 10.0);
        let engine = JudgmentEngine::default();

        assert_eq!(engine.judge(&mut timeline, lane(3), 10.0), Outcome::NoMatch);
        assert_eq!(engine.judge(&mut timeline, lane(0), 10.5), Outcome::NoMatch);
        assert!(timeline.get(id).is_some());
    }

    #[test]
    fn a_note_is_only_hit_once() {
        let mut timeline = NoteTimeline::new();
        timeline.spawn(lane(2), 5.0);
        let engine = JudgmentEngine::default();

        assert!(engine.judge(&mut timeline, lane(2), 5.0).is_hit());
        assert_eq!(engine.judge(&mut timeline, lane(2), 5.0), Outcome::NoMatch);
    }

    #[test]
    fn custom_windows_change_buckets() {
        let engine = JudgmentEngine::new(JudgmentWindows {
            perfect_ms: 20.0,
            great_ms: 60.0,
            good_ms: 150.0,
        });
        assert_eq!(engine.classify(30.0), Some(Tier::Great));
        assert_eq!(engine.classify(150.0), Some(Tier::Good));
        assert_eq!(engine.classify(150.1), None);
    }
}
