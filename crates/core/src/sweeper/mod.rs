use crate::{Note, NoteTimeline};

/// Converts notes that slipped past the widest hit window into misses.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSweeper {
    good_window_secs: f64,
}

impl TimeoutSweeper {
    pub fn new(good_window_secs: f64) -> Self {
        Self { good_window_secs }
    }

    /// Removes every note whose target time is older than `now` minus the
    /// good window and returns them marked missed. Must run every frame so
    /// the timeline stays bounded.
    pub fn sweep(&self, timeline: &mut NoteTimeline, now: f64) -> Vec<Note> {
        timeline.expire_before(now - self.good_window_secs)
    }
}

impl Default for TimeoutSweeper {
    fn default() -> Self {
        Self::new(crate::JudgmentWindows::default().good_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lane, Resolution};

    #[test]
    fn note_survives_until_good_window_closes() {
        let mut timeline = NoteTimeline::new();
        let lane = Lane::new(1).unwrap();
        let id = timeline.spawn(lane, 10.0);
        let sweeper = TimeoutSweeper::default();

        assert!(sweeper.sweep(&mut timeline, 10.149).is_empty());
        assert!(timeline.get(id).is_some());

        let missed = sweeper.sweep(&mut timeline, 10.151);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].resolution, Resolution::Missed);
        assert!(timeline.is_empty());
    }

    #[test]
    fn counts_every_expired_note() {
        let mut timeline = NoteTimeline::new();
        for (i, lane) in Lane::ALL.into_iter().enumerate() {
            timeline.spawn(lane, i as f64 * 0.25);
        }
        timeline.spawn(Lane::ALL[0], 5.0);

        let missed = TimeoutSweeper::default().sweep(&mut timeline, 2.0);
        assert_eq!(missed.len(), 4);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn empty_timeline_sweeps_to_nothing() {
        let mut timeline = NoteTimeline::new();
        assert!(TimeoutSweeper::default().sweep(&mut timeline, 100.0).is_empty());
    }
}
