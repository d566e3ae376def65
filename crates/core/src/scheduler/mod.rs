use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{AccentKind, AudioSink, BeatGenerator, Lane, NoteId, NoteTimeline, RenderRequest};

/// A note created by a scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnedNote {
    pub id: NoteId,
    pub lane: Lane,
    pub target_time: f64,
    pub accent: AccentKind,
}

/// What a single tick emitted, in target-time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub spawned: Vec<SpawnedNote>,
    /// Target times of kick beats, for visual pulsing.
    pub downbeats: Vec<f64>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
    }
}

/// Lookahead beat scheduler.
///
/// The cursor advances by exactly one eighth note per beat; drift against the
/// clock is absorbed by comparing the cursor to `now` on every tick rather
/// than accumulating tick deltas.
#[derive(Debug)]
pub struct BeatScheduler {
    generator: BeatGenerator,
    horizon_secs: f64,
    preroll_secs: f64,
    next_note_time: f64,
    beat_index: u64,
    running: bool,
    rng: StdRng,
}

impl BeatScheduler {
    pub fn new(generator: BeatGenerator, horizon_secs: f64, preroll_secs: f64, rng: StdRng) -> Self {
        Self {
            generator,
            horizon_secs,
            preroll_secs,
            next_note_time: 0.0,
            beat_index: 0,
            running: false,
            rng,
        }
    }

    /// Scheduler with a fixed seed, for reproducible patterns.
    pub fn seeded(generator: BeatGenerator, horizon_secs: f64, preroll_secs: f64, seed: u64) -> Self {
        Self::new(generator, horizon_secs, preroll_secs, StdRng::seed_from_u64(seed))
    }

    pub fn start(&mut self, at_time: f64) {
        self.next_note_time = at_time + self.preroll_secs;
        self.beat_index = 0;
        self.running = true;
        tracing::debug!(first_beat = self.next_note_time, "scheduler started");
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    pub fn beat_index(&self) -> u64 {
        self.beat_index
    }

    pub fn generator(&self) -> &BeatGenerator {
        &self.generator
    }

    /// Emits every beat due before `now + horizon`: an audio request to
    /// `sink` and a fresh unresolved note in `timeline` for each.
    pub fn tick(&mut self, now: f64, timeline: &mut NoteTimeline, sink: &dyn AudioSink) -> TickReport {
        let mut report = TickReport::default();
        let step = self.generator.step_secs();
        while self.running && self.next_note_time < now + self.horizon_secs {
            let target_time = self.next_note_time;
            let beat = self.generator.generate(self.beat_index, &mut self.rng);

            sink.schedule(RenderRequest::new(target_time, beat.accent));
            let id = timeline.spawn(beat.lane, target_time);
            tracing::debug!(
                index = self.beat_index,
                at = target_time,
                lane = beat.lane.index(),
                accent = ?beat.accent,
                "scheduled beat"
            );

            report.spawned.push(SpawnedNote {
                id,
                lane: beat.lane,
                target_time,
                accent: beat.accent,
            });
            if beat.accent == AccentKind::Kick {
                report.downbeats.push(target_time);
            }

            self.beat_index += 1;
            self.next_note_time += step;
        }
        report
    }
}
