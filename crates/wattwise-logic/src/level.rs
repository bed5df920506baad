//! Level orchestration: run a level's puzzles and advance when all are done.
//!
//! An orchestrator owns an ordered puzzle list. Each tick it polls
//! `is_completed` on every puzzle; the first tick on which all of them report
//! done fires the completion exactly once (collect the level key, unlock the
//! next level, change state). Re-entering the level resets everything,
//! including the fired flag.
//!
//! The final level carries a gate: it only activates once enough energy keys
//! have been collected.

use thiserror::Error;

use crate::constants::{sfx, FINAL_LEVEL, KEY_COUNT};
use crate::progress::ProgressStore;
use crate::puzzle::{PuzzleController, TickContext};
use crate::state::{GameState, StateMachine, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("missing energy keys: {collected} of {required} collected")]
    MissingKeys { collected: usize, required: usize },
}

/// Static description of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub level: u8,
    pub state: GameState,
    /// Where to go once every puzzle is done.
    pub next_state: GameState,
    /// Key awarded on completion. The final level's key comes from the quiz.
    pub key_index: Option<usize>,
    /// Keys needed to activate (the gate).
    pub required_keys: Option<usize>,
}

impl LevelSpec {
    /// Standard layout: levels before the last award key `level - 1`; the
    /// last level is gated on `required_keys`.
    pub fn standard(level: u8, required_keys: usize) -> Option<Self> {
        let state = GameState::from_level(level)?;
        let next_state = GameState::after_level(level)?;
        let is_final = level == FINAL_LEVEL;
        Some(Self {
            level,
            state,
            next_state,
            key_index: if is_final {
                None
            } else {
                Some(usize::from(level) - 1).filter(|i| *i < KEY_COUNT)
            },
            required_keys: is_final.then_some(required_keys),
        })
    }
}

/// What happened during one [`LevelOrchestrator::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTick {
    /// Not active; nothing ran.
    Idle,
    Playing { completed: usize, total: usize },
    /// Fired this tick.
    Completed(Option<Transition>),
    /// Already fired on an earlier tick.
    Done,
}

pub struct LevelOrchestrator {
    spec: LevelSpec,
    puzzles: Vec<Box<dyn PuzzleController>>,
    active: bool,
    has_fired: bool,
}

impl LevelOrchestrator {
    pub fn new(spec: LevelSpec, puzzles: Vec<Box<dyn PuzzleController>>) -> Self {
        Self {
            spec,
            puzzles,
            active: false,
            has_fired: false,
        }
    }

    pub fn spec(&self) -> &LevelSpec {
        &self.spec
    }

    pub fn level(&self) -> u8 {
        self.spec.level
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_fired(&self) -> bool {
        self.has_fired
    }

    pub fn puzzles(&self) -> &[Box<dyn PuzzleController>] {
        &self.puzzles
    }

    pub fn completed_count(&self) -> usize {
        self.puzzles.iter().filter(|p| p.is_completed()).count()
    }

    /// All puzzles done. Vacuously true for an empty level.
    pub fn is_done(&self) -> bool {
        self.puzzles.iter().all(|p| p.is_completed())
    }

    /// First puzzle of type `T`.
    pub fn puzzle<T: PuzzleController>(&self) -> Option<&T> {
        self.puzzles.iter().find_map(|p| p.downcast_ref::<T>())
    }

    pub fn puzzle_mut<T: PuzzleController>(&mut self) -> Option<&mut T> {
        self.puzzles.iter_mut().find_map(|p| p.downcast_mut::<T>())
    }

    pub fn check_gate(&self, progress: &ProgressStore) -> Result<(), GateError> {
        match self.spec.required_keys {
            Some(required) if progress.keys_collected() < required => Err(GateError::MissingKeys {
                collected: progress.keys_collected(),
                required,
            }),
            _ => Ok(()),
        }
    }

    /// Activate every puzzle, unless the gate is closed.
    pub fn activate(&mut self, progress: &ProgressStore) -> Result<(), GateError> {
        if let Err(e) = self.check_gate(progress) {
            log::warn!("Level {} gate closed: {}", self.spec.level, e);
            return Err(e);
        }
        self.active = true;
        for puzzle in &mut self.puzzles {
            puzzle.activate();
        }
        log::info!(
            "Level {} active with {} puzzle(s)",
            self.spec.level,
            self.puzzles.len()
        );
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        for puzzle in &mut self.puzzles {
            puzzle.deactivate();
        }
    }

    /// Reset every puzzle and re-arm completion.
    pub fn reset_state(&mut self) {
        self.has_fired = false;
        for puzzle in &mut self.puzzles {
            puzzle.reset_state();
        }
    }

    /// Start a fresh attempt: reset, then activate.
    pub fn enter(&mut self, progress: &ProgressStore) -> Result<(), GateError> {
        self.deactivate();
        self.reset_state();
        self.activate(progress)
    }

    /// Tick puzzles, then fire completion on the done edge.
    pub fn update(&mut self, ctx: &mut TickContext<'_>, machine: &mut StateMachine) -> LevelTick {
        if !self.active {
            return LevelTick::Idle;
        }
        for puzzle in &mut self.puzzles {
            puzzle.tick(ctx);
        }
        if self.has_fired {
            return LevelTick::Done;
        }
        if !self.is_done() {
            return LevelTick::Playing {
                completed: self.completed_count(),
                total: self.puzzles.len(),
            };
        }

        self.has_fired = true;
        LevelTick::Completed(self.fire(ctx, machine))
    }

    fn fire(&mut self, ctx: &mut TickContext<'_>, machine: &mut StateMachine) -> Option<Transition> {
        let level = self.spec.level;
        log::info!("Level {} complete", level);

        if let Some(index) = self.spec.key_index {
            if ctx.progress.collect_key(index).is_some() {
                ctx.feedback.play_sfx(sfx::KEY_COLLECTED);
                ctx.feedback.show_message(
                    &format!("Energy key {} collected!", index + 1),
                    true,
                    3.0,
                );
            }
        }
        ctx.progress.complete_level(u32::from(level));
        ctx.feedback.play_sfx(sfx::LEVEL_COMPLETE);

        machine.change_state(self.spec.next_state)
    }
}
