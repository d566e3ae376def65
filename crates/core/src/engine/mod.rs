//! Single owner of the note timeline and run state.
//!
//! The scheduler thread and the frame/input loop both reach the shared state
//! only through [`Engine`], which serialises every read-modify-write behind
//! one mutex. Each call holds the lock for a bounded, non-blocking update.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
};

use crossbeam_channel::Sender;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    AudioSink, BeatGenerator, BeatScheduler, BuildingBlock, Clock, ConstructionLog, EngineConfig,
    EngineError, JudgmentEngine, Lane, LaneInput, LevelTheme, Note, NoteTimeline, Outcome, Result,
    RunState, RunStatus, Tally, TickReport, TimeoutSweeper,
};

/// Everything rendering needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub now: f64,
    pub notes: Vec<Note>,
    pub run: RunState,
    /// Notes the sweep converted to misses during this frame.
    pub missed: Vec<Note>,
    /// Blocks built since the previous frame.
    pub new_blocks: Vec<BuildingBlock>,
    /// Kick times scheduled since the previous frame, for pulsing visuals.
    pub downbeats: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub theme: String,
    pub score: u64,
    pub max_combo: u32,
    pub health: f64,
    pub status: RunStatus,
    pub hits: u32,
    pub tally: Tally,
    pub blocks_built: usize,
}

#[derive(Debug)]
struct EngineCore {
    run: RunState,
    timeline: NoteTimeline,
    scheduler: Option<BeatScheduler>,
    construction: Option<ConstructionLog>,
    theme: Option<LevelTheme>,
    blocks_reported: usize,
    next_block_id: u64,
    pending_downbeats: Vec<f64>,
}

impl EngineCore {
    fn new() -> Self {
        Self {
            run: RunState::new(),
            timeline: NoteTimeline::new(),
            scheduler: None,
            construction: None,
            theme: None,
            blocks_reported: 0,
            next_block_id: 0,
            pending_downbeats: Vec::new(),
        }
    }

    /// Drops the construction log, remembering where its block ids stopped.
    fn retire_construction(&mut self) {
        if let Some(log) = self.construction.take() {
            self.next_block_id = log.next_id();
        }
        self.blocks_reported = 0;
    }

    fn stop_scheduler(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
    }
}

/// Cloneable handle to the shared engine state.
#[derive(Clone)]
pub struct Engine {
    core: Arc<Mutex<EngineCore>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AudioSink>,
    config: EngineConfig,
    judgment: JudgmentEngine,
    sweeper: TimeoutSweeper,
    seed: Option<u64>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        clock: impl Clock + 'static,
        sink: impl AudioSink + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(Mutex::new(EngineCore::new())),
            clock: Arc::new(clock),
            sink: Arc::new(sink),
            judgment: JudgmentEngine::new(config.windows),
            sweeper: TimeoutSweeper::new(config.windows.good_secs()),
            config,
            seed: None,
        })
    }

    /// Fixes the seed for lane selection and block colors. Without a seed
    /// every run draws fresh entropy from the OS.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Option<f64> {
        self.clock.now()
    }

    /// Validates `theme` and enters the running state. Fails without side
    /// effects if the theme is invalid, the engine is not idle, or the clock
    /// or audio sink is unavailable.
    pub fn start(&self, theme: LevelTheme) -> Result<()> {
        theme.validate()?;
        let now = self.clock.now().ok_or(EngineError::ClockUnavailable)?;
        if !self.sink.is_available() {
            return Err(EngineError::AudioUnavailable);
        }

        let mut core = self.lock()?;
        match core.run.status {
            RunStatus::Idle => {}
            RunStatus::Running => return Err(EngineError::AlreadyRunning),
            RunStatus::Ended => return Err(EngineError::RunEnded),
        }

        let (pattern_rng, color_seed) = match self.seed {
            Some(seed) => (StdRng::seed_from_u64(seed), seed.wrapping_add(1)),
            None => (StdRng::from_os_rng(), rand::random()),
        };
        let generator = BeatGenerator::new(theme.bpm, self.config.lane_override_probability);
        let mut scheduler = BeatScheduler::new(
            generator,
            self.config.lookahead_horizon_secs,
            self.config.preroll_secs,
            pattern_rng,
        );
        scheduler.start(now);

        core.timeline.clear();
        core.run.start();
        core.scheduler = Some(scheduler);
        core.retire_construction();
        core.construction =
            Some(ConstructionLog::new(theme.clone(), color_seed).with_first_id(core.next_block_id));
        core.pending_downbeats.clear();
        tracing::info!(theme = %theme.name, bpm = theme.bpm, at = now, "run started");
        core.theme = Some(theme);
        Ok(())
    }

    /// Stops scheduling new beats. Audio already handed to the sink still
    /// plays. Idempotent.
    pub fn stop(&self) -> Result<()> {
        let mut core = self.lock()?;
        core.stop_scheduler();
        tracing::info!("scheduler stopped");
        Ok(())
    }

    /// Returns to idle, discarding live notes. Required after a run ends
    /// before the next `start`.
    pub fn reset(&self) -> Result<()> {
        let mut core = self.lock()?;
        core.stop_scheduler();
        core.scheduler = None;
        core.timeline.clear();
        core.run.reset();
        core.retire_construction();
        core.pending_downbeats.clear();
        core.theme = None;
        Ok(())
    }

    /// One scheduler period. A no-op when the clock is unavailable or no run
    /// is in progress.
    pub fn scheduler_tick(&self) -> Result<TickReport> {
        let Some(now) = self.clock.now() else {
            return Ok(TickReport::default());
        };
        let mut core = self.lock()?;
        if !core.run.is_running() {
            return Ok(TickReport::default());
        }
        let EngineCore {
            scheduler,
            timeline,
            pending_downbeats,
            ..
        } = &mut *core;
        let report = match scheduler.as_mut() {
            Some(scheduler) => scheduler.tick(now, timeline, self.sink.as_ref()),
            None => TickReport::default(),
        };
        pending_downbeats.extend_from_slice(&report.downbeats);
        Ok(report)
    }

    /// Judges a press on `lane` stamped with the current clock.
    pub fn press(&self, lane: Lane) -> Result<Outcome> {
        match self.clock.now() {
            Some(now) => self.judge(LaneInput {
                lane,
                observed_at: now,
            }),
            None => Ok(Outcome::NoMatch),
        }
    }

    /// Judges an already timestamped press and feeds the result into the run
    /// state. Presses outside a running run are ignored.
    pub fn judge(&self, input: LaneInput) -> Result<Outcome> {
        let mut core = self.lock()?;
        if !core.run.is_running() {
            return Ok(Outcome::NoMatch);
        }
        let outcome = self
            .judgment
            .judge(&mut core.timeline, input.lane, input.observed_at);
        if let Outcome::Hit {
            tier, offset_ms, ..
        } = outcome
        {
            let points = core.run.apply_hit(tier);
            let combo = core.run.combo;
            if let Some(log) = core.construction.as_mut() {
                log.record(combo);
            }
            tracing::debug!(lane = input.lane.index(), ?tier, offset_ms, points, combo, "hit");
        }
        Ok(outcome)
    }

    /// One render-loop period: sweeps expired notes into misses, applies them
    /// to the run state and returns the frame's snapshot.
    pub fn frame(&self) -> Result<FrameSnapshot> {
        let now = self.clock.now();
        let mut core = self.lock()?;

        let mut missed = Vec::new();
        if let Some(now) = now {
            if core.run.is_running() {
                missed = self.sweeper.sweep(&mut core.timeline, now);
                let count = u32::try_from(missed.len()).unwrap_or(u32::MAX);
                if count > 0 {
                    tracing::debug!(count, health = core.run.health, "notes missed");
                }
                if core.run.apply_misses(count) {
                    core.stop_scheduler();
                    tracing::info!(
                        score = core.run.score,
                        max_combo = core.run.max_combo,
                        "run ended"
                    );
                }
            }
        }

        let new_blocks = match core.construction.as_ref() {
            Some(log) => log.since(core.blocks_reported).to_vec(),
            None => Vec::new(),
        };
        core.blocks_reported += new_blocks.len();
        let downbeats = std::mem::take(&mut core.pending_downbeats);

        Ok(FrameSnapshot {
            now: now.unwrap_or_default(),
            notes: core.timeline.snapshot(),
            run: core.run,
            missed,
            new_blocks,
            downbeats,
        })
    }

    pub fn run_state(&self) -> Result<RunState> {
        Ok(self.lock()?.run)
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        Ok(self.lock()?.timeline.snapshot())
    }

    pub fn blocks(&self) -> Result<Vec<BuildingBlock>> {
        let core = self.lock()?;
        Ok(core
            .construction
            .as_ref()
            .map(|log| log.blocks().to_vec())
            .unwrap_or_default())
    }

    pub fn summary(&self) -> Result<RunSummary> {
        let core = self.lock()?;
        Ok(RunSummary {
            theme: core
                .theme
                .as_ref()
                .map(|theme| theme.name.clone())
                .unwrap_or_default(),
            score: core.run.score,
            max_combo: core.run.max_combo,
            health: core.run.health,
            status: core.run.status,
            hits: core.run.tally.hits(),
            tally: core.run.tally,
            blocks_built: core.construction.as_ref().map_or(0, ConstructionLog::len),
        })
    }

    /// Drives [`Engine::scheduler_tick`] from a background thread every
    /// `poll_interval_ms`, independent of the frame loop.
    pub fn spawn_scheduler(&self) -> Result<SchedulerHandle> {
        let engine = self.clone();
        let interval = self.config.poll_interval();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("beat-scheduler".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    crossbeam_channel::select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if let Err(err) = engine.scheduler_tick() {
                                tracing::error!(%err, "scheduler tick failed");
                                break;
                            }
                        }
                    }
                }
                tracing::debug!("scheduler thread exited");
            })?;

        Ok(SchedulerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineCore>> {
        self.core
            .lock()
            .map_err(|_| EngineError::Poisoned("engine state"))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .finish()
    }
}

/// Owns the background scheduler thread. Stopping or dropping the handle
/// cancels the recurring tick and joins the thread.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
