use std::{collections::HashMap, path::PathBuf, thread};

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rhythm_engine_core::{
    ChannelSink, Engine, EngineConfig, EngineError, Lane, LaneInput, LevelTheme, MonotonicClock,
    Note, NoteId, Outcome, PressFilter, RunStatus,
};
use tracing_subscriber::EnvFilter;

fn main() -> rhythm_engine_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            theme,
            config,
            seed,
            seconds,
            accuracy_ms,
            miss_rate,
        } => {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid_arg("seconds", "must be a finite, non-negative number"));
            }
            let player = SimulatedPlayer::new(accuracy_ms, miss_rate, seed)?;
            run_play(theme.as_ref(), config.as_ref(), seed, seconds, player)
        }
        Commands::CheckTheme { path } => run_check_theme(&path),
    }
}

fn run_play(
    theme: Option<&PathBuf>,
    config: Option<&PathBuf>,
    seed: Option<u64>,
    seconds: f64,
    mut player: SimulatedPlayer,
) -> rhythm_engine_core::Result<()> {
    let theme = match theme {
        Some(path) => LevelTheme::from_path(path)?,
        None => LevelTheme::default(),
    };
    let config = match config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    tracing::info!(theme = %theme.name, bpm = theme.bpm, seconds, "starting headless session");

    let (sink, requests) = ChannelSink::bounded(config.audio_queue_capacity);
    let backend = thread::Builder::new()
        .name("audio-backend".to_string())
        .spawn(move || {
            let mut rendered = 0usize;
            for request in &requests {
                if !request.voice.is_silent() {
                    tracing::trace!(at = request.scheduled_time, accent = ?request.accent, "render");
                    rendered += 1;
                }
            }
            rendered
        })?;

    let frame_interval = config.frame_interval();
    let mut engine = Engine::new(config, MonotonicClock::new(), sink)?;
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }
    engine.start(theme)?;
    let scheduler = engine.spawn_scheduler()?;

    let deadline = engine.now().unwrap_or_default() + seconds;
    loop {
        thread::sleep(frame_interval);
        let frame = engine.frame()?;
        for note in &frame.missed {
            tracing::debug!(id = note.id.get(), lane = note.lane.index(), "miss");
        }
        if frame.run.status == RunStatus::Ended {
            tracing::info!("health depleted");
            break;
        }
        if frame.now >= deadline {
            break;
        }
        for input in player.presses(&frame.notes, frame.now) {
            if let Outcome::Hit { tier, offset_ms, .. } = engine.judge(input)? {
                tracing::debug!(lane = input.lane.index(), ?tier, offset_ms, "hit");
            }
        }
    }

    scheduler.stop();
    engine.stop()?;
    let summary = engine.summary()?;
    drop(engine);

    let rendered = backend.join().unwrap_or_default();
    tracing::info!(rendered, "audio backend drained");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_check_theme(path: &PathBuf) -> rhythm_engine_core::Result<()> {
    let theme = LevelTheme::from_path(path)?;
    tracing::info!(?path, name = %theme.name, bpm = theme.bpm, "theme is valid");
    println!("{}", serde_json::to_string_pretty(&theme)?);
    Ok(())
}

fn invalid_arg(field: &'static str, reason: &str) -> EngineError {
    EngineError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// How long the simulated player keeps a key down after pressing it.
const HOLD_SECS: f64 = 0.08;

/// Stand-in for a human at the keyboard: each note is either skipped or
/// pressed with a bounded timing error. Keys stay down for [`HOLD_SECS`] and
/// auto-repeat while held, so a note that comes due on a lane that is still
/// held is lost.
struct SimulatedPlayer {
    accuracy_secs: f64,
    miss_rate: f64,
    rng: StdRng,
    filter: PressFilter,
    plans: HashMap<NoteId, Option<f64>>,
    release_at: [Option<f64>; Lane::ALL.len()],
}

impl SimulatedPlayer {
    fn new(accuracy_ms: f64, miss_rate: f64, seed: Option<u64>) -> rhythm_engine_core::Result<Self> {
        if !accuracy_ms.is_finite() {
            return Err(invalid_arg("accuracy_ms", "must be a finite number"));
        }
        if !miss_rate.is_finite() {
            return Err(invalid_arg("miss_rate", "must be a finite number"));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ 0x5eed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            accuracy_secs: accuracy_ms.abs() / 1000.0,
            miss_rate: miss_rate.clamp(0.0, 1.0),
            rng,
            filter: PressFilter::new(),
            plans: HashMap::new(),
            release_at: [None; Lane::ALL.len()],
        })
    }

    /// Presses due by `now` for the live notes, oldest first.
    fn presses(&mut self, notes: &[Note], now: f64) -> Vec<LaneInput> {
        let mut due = Vec::new();
        for lane in Lane::ALL {
            let slot = &mut self.release_at[usize::from(lane.index())];
            match *slot {
                Some(release) if release <= now => {
                    self.filter.key_up(lane);
                    *slot = None;
                }
                // auto-repeat; the filter swallows it
                Some(_) => due.extend(self.filter.key_down(lane, now)),
                None => {}
            }
        }

        self.plans
            .retain(|id, _| notes.iter().any(|note| note.id == *id));
        for note in notes {
            let plan = *self.plans.entry(note.id).or_insert_with(|| {
                if self.rng.random_bool(self.miss_rate) {
                    None
                } else {
                    let jitter = if self.accuracy_secs > 0.0 {
                        self.rng.random_range(-self.accuracy_secs..=self.accuracy_secs)
                    } else {
                        0.0
                    };
                    Some(note.target_time + jitter)
                }
            });
            if let Some(at) = plan.filter(|at| *at <= now) {
                self.plans.insert(note.id, None);
                if let Some(input) = self.filter.key_down(note.lane, at) {
                    self.release_at[usize::from(note.lane.index())] = Some(at + HOLD_SECS);
                    due.push(input);
                }
            }
        }
        due.sort_by(|a, b| a.observed_at.total_cmp(&b.observed_at));
        due
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Procedural rhythm engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a real-time session against a simulated player.
    Play {
        /// Theme JSON file; the built-in theme is used when omitted.
        #[arg(short, long)]
        theme: Option<PathBuf>,
        /// Engine configuration JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for the beat pattern and the simulated player.
        #[arg(long)]
        seed: Option<u64>,
        /// Session length in seconds.
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,
        /// Maximum timing error of the simulated player.
        #[arg(long, default_value_t = 60.0)]
        accuracy_ms: f64,
        /// Fraction of notes the simulated player skips.
        #[arg(long, default_value_t = 0.05)]
        miss_rate: f64,
    },
    /// Parse and validate a theme file.
    CheckTheme {
        /// Path to the theme JSON.
        path: PathBuf,
    },
}
