use serde::{Deserialize, Serialize};

use crate::{Lane, Tier};

/// Opaque note identity, unique within an engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(u64);

impl NoteId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Unresolved,
    Hit(Tier),
    Missed,
}

impl Resolution {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub lane: Lane,
    /// Clock time at which a press has zero timing error.
    pub target_time: f64,
    pub resolution: Resolution,
}

/// The live set of unresolved notes, kept in spawn order.
///
/// Notes leave the timeline the moment they resolve; the removed copy carries
/// the terminal [`Resolution`] back to the caller.
#[derive(Debug, Default, Clone)]
pub struct NoteTimeline {
    notes: Vec<Note>,
    next_id: u64,
}

impl NoteTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, lane: Lane, target_time: f64) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        self.notes.push(Note {
            id,
            lane,
            target_time,
            resolution: Resolution::Unresolved,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Read-only copy for rendering.
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }

    /// Finds the note on `lane` closest to `now`. Ties keep the earliest
    /// spawned note. Returns the note id and the absolute distance in seconds.
    pub fn nearest_on_lane(&self, lane: Lane, now: f64) -> Option<(NoteId, f64)> {
        let mut best: Option<(NoteId, f64)> = None;
        for note in self.notes.iter().filter(|note| note.lane == lane) {
            let delta = (note.target_time - now).abs();
            if best.map_or(true, |(_, min)| delta < min) {
                best = Some((note.id, delta));
            }
        }
        best
    }

    /// Removes the note and returns it carrying `resolution`. Returns `None`
    /// if the note is no longer live, so a note can never resolve twice.
    pub fn resolve(&mut self, id: NoteId, resolution: Resolution) -> Option<Note> {
        debug_assert!(resolution.is_terminal());
        let index = self.notes.iter().position(|note| note.id == id)?;
        let mut note = self.notes.remove(index);
        note.resolution = resolution;
        Some(note)
    }

    /// Removes every note whose target time is strictly before `deadline`,
    /// marking each one missed.
    pub fn expire_before(&mut self, deadline: f64) -> Vec<Note> {
        let mut expired = Vec::new();
        self.notes.retain(|note| {
            if note.target_time < deadline {
                expired.push(Note {
                    resolution: Resolution::Missed,
                    ..*note
                });
                false
            } else {
                true
            }
        });
        expired
    }

    /// Drops every live note. Ids keep counting up.
    pub fn clear(&mut self) {
        self.notes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(index: u8) -> Lane {
        Lane::new(index).unwrap()
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut timeline = NoteTimeline::new();
        let a = timeline.spawn(lane(0), 1.0);
        let b = timeline.spawn(lane(0), 1.25);
        timeline.clear();
        let c = timeline.spawn(lane(1), 1.5);
        assert!(a < b && b < c);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn nearest_picks_minimum_distance_on_lane() {
        let mut timeline = NoteTimeline::new();
        timeline.spawn(lane(1), 10.0);
        let middle = timeline.spawn(lane(1), 10.05);
        timeline.spawn(lane(1), 10.09);
        timeline.spawn(lane(2), 10.06);

        let (id, delta) = timeline.nearest_on_lane(lane(1), 10.06).unwrap();
        assert_eq!(id, middle);
        assert!((delta - 0.01).abs() < 1e-9);
        assert!(timeline.nearest_on_lane(lane(3), 10.06).is_none());
    }

    #[test]
    fn exact_tie_keeps_first_spawned() {
        let mut timeline = NoteTimeline::new();
        let first = timeline.spawn(lane(0), 4.0);
        timeline.spawn(lane(0), 5.0);
        let (id, _) = timeline.nearest_on_lane(lane(0), 4.5).unwrap();
        assert_eq!(id, first);
    }

    #[test]
    fn resolve_removes_exactly_once() {
        let mut timeline = NoteTimeline::new();
        let id = timeline.spawn(lane(2), 3.0);
        let note = timeline.resolve(id, Resolution::Hit(Tier::Great)).unwrap();
        assert_eq!(note.resolution, Resolution::Hit(Tier::Great));
        assert!(timeline.resolve(id, Resolution::Missed).is_none());
        assert!(timeline.is_empty());
    }

    #[test]
    fn expire_before_is_strict() {
        let mut timeline = NoteTimeline::new();
        timeline.spawn(lane(0), 1.0);
        let kept = timeline.spawn(lane(0), 2.0);
        let expired = timeline.expire_before(2.0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].resolution, Resolution::Missed);
        assert!(timeline.get(kept).is_some());
    }
}
