//! Pure progression logic for WattWise.
//!
//! This crate contains the game rules that are independent of rendering,
//! audio and storage: which scene is active, how puzzles report completion,
//! how energy keys unlock the final level, and how the final quiz is drawn,
//! timed and scored. Collaborators (persistence, audio, UI) are injected as
//! traits, so everything here is unit-testable with in-memory fakes.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | JSON game configuration with defaults and validation |
//! | [`constants`] | Key/level counts, quiz constants, sound effect names |
//! | [`feedback`] | Audio/UI collaborator trait, recording sink, per-puzzle outbox |
//! | [`level`] | Level orchestrator: edge-triggered completion and the key gate |
//! | [`progress`] | Energy keys, unlocked level, volumes, persistence backend |
//! | [`puzzle`] | `PuzzleController` lifecycle contract and tick context |
//! | [`puzzles`] | Cable wiring, TV sequence, kitchen efficiency, bill simulator |
//! | [`quiz`] | Randomized, timed, scored final quiz |
//! | [`state`] | Game state machine with enter/exit handlers and subscribers |
//! | [`timing`] | Countdown and cancellable delayed-task queue |

pub mod config;
pub mod constants;
pub mod feedback;
pub mod level;
pub mod progress;
pub mod puzzle;
pub mod puzzles;
pub mod quiz;
pub mod state;
pub mod timing;
