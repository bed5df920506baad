//! The contract every mini-game implements.
//!
//! A level only ever asks a puzzle whether it is completed. What flips that
//! flag (wires connected, bill under target, quiz passed) is private to the
//! puzzle.

use std::any::Any;

use crate::feedback::GameFeedback;
use crate::progress::ProgressStore;

/// Per-tick access to the shared collaborators.
pub struct TickContext<'a> {
    /// Seconds since the previous tick.
    pub dt: f32,
    pub progress: &'a mut ProgressStore,
    pub feedback: &'a mut dyn GameFeedback,
}

impl<'a> TickContext<'a> {
    pub fn new(dt: f32, progress: &'a mut ProgressStore, feedback: &'a mut dyn GameFeedback) -> Self {
        Self {
            dt,
            progress,
            feedback,
        }
    }
}

/// Lifecycle shared by all puzzles.
///
/// - `activate`: enable interaction and reset per-attempt transient state.
///   No effect when already active.
/// - `deactivate`: disable interaction and cancel pending timed
///   continuations. Completion is kept.
/// - `is_completed`: once true it stays true until `reset_state`.
/// - `reset_state`: back to the initial configuration, cancelling anything
///   pending.
pub trait PuzzleController: Any {
    fn name(&self) -> &str;
    fn activate(&mut self);
    fn deactivate(&mut self);
    fn is_active(&self) -> bool;
    fn is_completed(&self) -> bool;
    fn reset_state(&mut self);

    /// Advance timers and flush queued feedback. Called once per tick while
    /// the owning level is running.
    fn tick(&mut self, _ctx: &mut TickContext<'_>) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn PuzzleController {
    /// Typed access for routing UI events to a concrete puzzle.
    pub fn downcast_ref<T: PuzzleController>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: PuzzleController>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Minimal puzzle completed by hand. Used for tests and scripted levels.
#[derive(Debug, Clone, Default)]
pub struct ManualPuzzle {
    name: String,
    active: bool,
    completed: bool,
    activations: u32,
}

impl ManualPuzzle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Mark solved. Ignored while inactive.
    pub fn solve(&mut self) {
        if self.active {
            self.completed = true;
        }
    }

    /// How many times `activate` actually took effect.
    pub fn activations(&self) -> u32 {
        self.activations
    }
}

impl PuzzleController for ManualPuzzle {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.activations += 1;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn reset_state(&mut self) {
        self.completed = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
