//! Core library for the rhythm engine.
//!
//! A procedural beat pattern is scheduled ahead of the clock, each beat
//! becomes a hittable note on one of four lanes, and lane presses are judged
//! against the live notes to drive score, combo and health. Each module owns
//! one stage of that pipeline; [`Engine`] ties them together behind a single
//! lock so the scheduler thread and the frame loop can share state.

pub mod audio;
pub mod beat;
pub mod clock;
pub mod config;
pub mod construction;
pub mod engine;
pub mod error;
pub mod input;
pub mod judgment;
pub mod scheduler;
pub mod state;
pub mod sweeper;
pub mod theme;
pub mod timeline;

pub use audio::{AudioSink, ChannelSink, RenderQueue, RenderRequest, Voice, Waveform};
pub use beat::{AccentKind, Beat, BeatGenerator, Lane};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{EngineConfig, JudgmentWindows};
pub use construction::{BlockId, BuildingBlock, ColorChoice, ConstructionLog};
pub use engine::{Engine, FrameSnapshot, RunSummary, SchedulerHandle};
pub use error::{EngineError, Result};
pub use input::{LaneInput, PressFilter};
pub use judgment::{JudgmentEngine, Outcome, Tier};
pub use scheduler::{BeatScheduler, SpawnedNote, TickReport};
pub use state::{RunState, RunStatus, Tally};
pub use sweeper::TimeoutSweeper;
pub use theme::{BlockShape, BuildingShape, LevelTheme, Palette};
pub use timeline::{Note, NoteId, NoteTimeline, Resolution};
