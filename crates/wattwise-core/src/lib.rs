//! WattWise Core - game engine for the household electricity adventure
//!
//! Wires the pure rules from `wattwise-logic` into a playable game: the
//! standard four levels, opening and ending narration, pause handling,
//! level select and file-backed progress.
//!
//! # Example
//!
//! ```rust,no_run
//! use wattwise_core::prelude::*;
//!
//! let progress = ProgressStore::open(Box::new(JsonFileBackend::in_dir("saves")));
//! let mut engine = GameEngine::bundled(progress, Box::new(SilentFeedback)).unwrap();
//!
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod data;
pub mod engine;
pub mod persistence;
pub mod scene;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{EngineError, GameEngine, LevelSelectError};
    pub use crate::persistence::JsonFileBackend;
    pub use wattwise_logic::feedback::{GameFeedback, RecordingFeedback, SilentFeedback};
    pub use wattwise_logic::progress::{ProgressStore, VolumeChannel};
    pub use wattwise_logic::puzzle::PuzzleController;
    pub use wattwise_logic::puzzles::*;
    pub use wattwise_logic::quiz::{QuizEngine, QuizPhase};
    pub use wattwise_logic::state::GameState;
}
