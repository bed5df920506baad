//! Game engine - main entry point for running WattWise

use std::collections::BTreeMap;

use thiserror::Error;

use wattwise_logic::config::{ConfigError, GameConfig};
use wattwise_logic::constants::{sfx, FINAL_LEVEL, LEVEL_COUNT};
use wattwise_logic::feedback::GameFeedback;
use wattwise_logic::level::{GateError, LevelOrchestrator, LevelSpec, LevelTick};
use wattwise_logic::progress::{ProgressStore, VolumeChannel};
use wattwise_logic::puzzle::{PuzzleController, TickContext};
use wattwise_logic::puzzles::{
    BillSimulatorPuzzle, CableWiringPuzzle, KitchenEfficiencyPuzzle, TvSequencePuzzle,
};
use wattwise_logic::quiz::{QuizEngine, QuizError, QuizQuestion};
use wattwise_logic::state::{
    GameState, SetupError, StateMachine, SubscriptionId, Transition, TransitionListener,
};

use crate::data;
use crate::scene::SceneRunner;

/// Errors while assembling the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Why a level could not be started from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LevelSelectError {
    #[error("level {0} does not exist")]
    UnknownLevel(u8),
    #[error("level {level} is locked (highest unlocked: {unlocked})")]
    Locked { level: u8, unlocked: u32 },
    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Build the standard four levels from configuration.
///
/// Level 1: cable wiring. Level 2: TV sequence. Level 3: kitchen efficiency
/// and bill simulator. Level 4: the quiz, behind the key gate.
pub fn build_levels(
    config: &GameConfig,
    bank: Vec<QuizQuestion>,
) -> Result<Vec<LevelOrchestrator>, EngineError> {
    config.validate()?;
    if config.quiz.session_size > bank.len() {
        return Err(QuizError::SessionTooLarge {
            requested: config.quiz.session_size,
            available: bank.len(),
        }
        .into());
    }
    let required = config.gate.required_keys;
    let spec = |level: u8| {
        LevelSpec::standard(level, required).ok_or(SetupError::UnknownLevel(level))
    };
    let tv_seed = config.quiz.seed.unwrap_or_else(rand::random);

    let levels = vec![
        LevelOrchestrator::new(
            spec(1)?,
            vec![Box::new(CableWiringPuzzle::new(&config.levels.cable)?)],
        ),
        LevelOrchestrator::new(
            spec(2)?,
            vec![Box::new(TvSequencePuzzle::new(&config.levels.tv, tv_seed)?)],
        ),
        LevelOrchestrator::new(
            spec(3)?,
            vec![
                Box::new(KitchenEfficiencyPuzzle::new(&config.levels.kitchen)?),
                Box::new(BillSimulatorPuzzle::new(&config.levels.bill)?),
            ],
        ),
        LevelOrchestrator::new(
            spec(FINAL_LEVEL)?,
            vec![Box::new(QuizEngine::new(bank, config.quiz.clone())?)],
        ),
    ];
    Ok(levels)
}

/// Main game engine.
///
/// Owns the state machine, the player's progress, every level and the
/// feedback sink, and routes every state change through one place so level
/// activation, pausing and cutscenes stay consistent.
pub struct GameEngine {
    machine: StateMachine,
    progress: ProgressStore,
    levels: BTreeMap<u8, LevelOrchestrator>,
    feedback: Box<dyn GameFeedback>,
    config: GameConfig,
    scene: SceneRunner,
    /// State that was interrupted by the pause menu.
    suspended: Option<GameState>,
    /// Seconds of unpaused play.
    play_time: f64,
    time_scale: f32,
}

impl GameEngine {
    /// Standard game with no state handlers, starting at the opening scene.
    pub fn new(
        config: GameConfig,
        bank: Vec<QuizQuestion>,
        progress: ProgressStore,
        feedback: Box<dyn GameFeedback>,
    ) -> Result<Self, EngineError> {
        Self::with_machine(
            StateMachine::new(GameState::OpeningScene),
            config,
            bank,
            progress,
            feedback,
        )
    }

    /// Standard game using the bundled configuration and question bank.
    pub fn bundled(
        progress: ProgressStore,
        feedback: Box<dyn GameFeedback>,
    ) -> Result<Self, EngineError> {
        let config = data::bundled_config()?;
        let bank = data::bundled_question_bank()?;
        Self::new(config, bank, progress, feedback)
    }

    /// Standard levels on a prepared machine (with scene handlers registered).
    pub fn with_machine(
        machine: StateMachine,
        config: GameConfig,
        bank: Vec<QuizQuestion>,
        progress: ProgressStore,
        feedback: Box<dyn GameFeedback>,
    ) -> Result<Self, EngineError> {
        let levels = build_levels(&config, bank)?;
        Self::from_levels(machine, levels, config, progress, feedback)
    }

    /// Assemble from explicit levels. Each level state may appear once.
    pub fn from_levels(
        machine: StateMachine,
        levels: Vec<LevelOrchestrator>,
        config: GameConfig,
        progress: ProgressStore,
        feedback: Box<dyn GameFeedback>,
    ) -> Result<Self, EngineError> {
        let mut by_number = BTreeMap::new();
        for level in levels {
            let state = level.spec().state;
            let Some(number) = state.level_number() else {
                return Err(SetupError::NotALevel(state).into());
            };
            if by_number.contains_key(&number) {
                return Err(SetupError::DuplicateLevel(state).into());
            }
            by_number.insert(number, level);
        }

        let mut engine = Self {
            machine,
            progress,
            levels: by_number,
            feedback,
            config,
            scene: SceneRunner::new(),
            suspended: None,
            play_time: 0.0,
            time_scale: 1.0,
        };
        let initial = engine.machine.current_state();
        engine.enter(initial);
        log::info!(
            "Game engine ready: {} level(s), starting in {:?}",
            engine.levels.len(),
            initial
        );
        Ok(engine)
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Advance the game by `delta_seconds` of wall time.
    pub fn update(&mut self, delta_seconds: f32) {
        let dt = delta_seconds.max(0.0) * self.time_scale;
        let state = self.machine.current_state();

        match state {
            GameState::OpeningScene | GameState::EndingScene => {
                self.play_time += f64::from(dt);
                if self.scene.advance(dt, self.feedback.as_mut()) {
                    self.change_state(GameState::MainMenu);
                }
            }
            _ => {
                let Some(number) = state.level_number() else {
                    return;
                };
                self.play_time += f64::from(dt);
                let Some(level) = self.levels.get_mut(&number) else {
                    return;
                };
                let mut ctx = TickContext::new(dt, &mut self.progress, self.feedback.as_mut());
                let tick = level.update(&mut ctx, &mut self.machine);
                if let LevelTick::Completed(Some(transition)) = tick {
                    self.on_transition(transition);
                }
            }
        }
    }

    // ========================================================================
    // STATE CHANGES
    // ========================================================================

    /// Change state and run level/scene bookkeeping for the transition.
    pub fn change_state(&mut self, next: GameState) -> Option<Transition> {
        let transition = self.machine.change_state(next)?;
        self.on_transition(transition);
        Some(transition)
    }

    fn on_transition(&mut self, transition: Transition) {
        if transition.to == GameState::Paused {
            self.suspended = Some(transition.from);
            log::debug!("Paused {:?}", transition.from);
            return;
        }

        let from = if transition.from == GameState::Paused {
            match self.suspended.take() {
                // Back where we paused: everything is still running
                Some(s) if s == transition.to => return,
                Some(s) => s,
                None => GameState::Paused,
            }
        } else {
            transition.from
        };

        self.leave(from);
        self.enter(transition.to);
    }

    fn leave(&mut self, state: GameState) {
        match state {
            GameState::OpeningScene | GameState::EndingScene => {
                self.scene.stop();
            }
            _ => {
                if let Some(level) = state.level_number().and_then(|n| self.levels.get_mut(&n)) {
                    level.deactivate();
                }
            }
        }
    }

    fn enter(&mut self, state: GameState) {
        match state {
            GameState::OpeningScene => self.scene.start(&self.config.opening),
            GameState::EndingScene => self.scene.start(&self.config.ending),
            _ => {
                let Some(number) = state.level_number() else {
                    return;
                };
                let Some(level) = self.levels.get_mut(&number) else {
                    log::warn!("No level registered for {:?}", state);
                    return;
                };
                match level.enter(&self.progress) {
                    Ok(()) => {
                        self.feedback
                            .play_narration(&format!("level{}_intro", number));
                    }
                    Err(e) => {
                        self.report_gate(e);
                        self.change_state(GameState::MainMenu);
                    }
                }
            }
        }
    }

    fn report_gate(&mut self, e: GateError) {
        let GateError::MissingKeys {
            collected,
            required,
        } = e;
        self.feedback.play_sfx(sfx::DENIED);
        self.feedback.show_message(
            &format!(
                "The gate is locked: you need {} energy keys and have {}.",
                required, collected
            ),
            false,
            3.0,
        );
    }

    /// Start level `level` from the level select.
    ///
    /// Allowed only up to the highest unlocked level, and for the final
    /// level only with enough keys. Starting the level already being played
    /// restarts it.
    pub fn start_level(&mut self, level: u8) -> Result<(), LevelSelectError> {
        let state = GameState::from_level(level).ok_or(LevelSelectError::UnknownLevel(level))?;
        let Some(orchestrator) = self.levels.get(&level) else {
            return Err(LevelSelectError::UnknownLevel(level));
        };
        if !self.progress.is_level_unlocked(u32::from(level)) {
            return Err(LevelSelectError::Locked {
                level,
                unlocked: self.progress.current_level(),
            });
        }
        if let Err(e) = orchestrator.check_gate(&self.progress) {
            log::warn!("Level {} rejected: {}", level, e);
            self.report_gate(e);
            return Err(e.into());
        }

        if self.machine.current_state() == state {
            self.enter(state);
        } else {
            self.change_state(state);
        }
        Ok(())
    }

    /// Start the highest unlocked level.
    pub fn continue_game(&mut self) -> Result<(), LevelSelectError> {
        let level = self.progress.current_level().clamp(1, u32::from(LEVEL_COUNT));
        self.start_level(level as u8)
    }

    /// Final-level gate check without starting anything.
    pub fn gate_status(&self) -> Result<(), GateError> {
        match self.levels.get(&FINAL_LEVEL) {
            Some(level) => level.check_gate(&self.progress),
            None => Ok(()),
        }
    }

    /// Skip the opening narration straight to the main menu.
    pub fn skip_opening(&mut self) -> bool {
        if self.machine.current_state() != GameState::OpeningScene {
            return false;
        }
        self.change_state(GameState::MainMenu);
        true
    }

    /// Freeze the current level or scene.
    pub fn pause(&mut self) -> Option<Transition> {
        let state = self.machine.current_state();
        let pausable = state.is_level()
            || matches!(state, GameState::OpeningScene | GameState::EndingScene);
        if !pausable {
            return None;
        }
        self.change_state(GameState::Paused)
    }

    /// Return from the pause menu to the interrupted state.
    pub fn resume(&mut self) -> Option<Transition> {
        let transition = self.machine.resume_from_pause()?;
        self.on_transition(transition);
        Some(transition)
    }

    pub fn subscribe(&mut self, listener: TransitionListener) -> SubscriptionId {
        self.machine.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.machine.unsubscribe(id)
    }

    // ========================================================================
    // PROGRESS & SETTINGS
    // ========================================================================

    pub fn set_volume(&mut self, channel: VolumeChannel, value: f32) {
        self.progress.set_volume(channel, value);
    }

    /// Channel volume after the master multiplier.
    pub fn effective_volume(&self, channel: VolumeChannel) -> f32 {
        self.progress.volumes().effective(channel)
    }

    /// Wipe progress, reset every level and return to the main menu.
    pub fn reset_progress(&mut self) {
        self.progress.reset_progress();
        for level in self.levels.values_mut() {
            level.deactivate();
            level.reset_state();
        }
        self.suspended = None;
        self.change_state(GameState::MainMenu);
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn current_state(&self) -> GameState {
        self.machine.current_state()
    }

    pub fn previous_state(&self) -> GameState {
        self.machine.previous_state()
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn level(&self, level: u8) -> Option<&LevelOrchestrator> {
        self.levels.get(&level)
    }

    pub fn is_scene_running(&self) -> bool {
        self.scene.is_running()
    }

    /// Puzzle of type `T` in the level being played (or paused).
    pub fn puzzle_mut<T: PuzzleController>(&mut self) -> Option<&mut T> {
        let state = match self.machine.current_state() {
            GameState::Paused => self.suspended?,
            s => s,
        };
        let number = state.level_number()?;
        self.levels.get_mut(&number)?.puzzle_mut::<T>()
    }

    /// Puzzle of type `T` in any level.
    pub fn find_puzzle<T: PuzzleController>(&self) -> Option<&T> {
        self.levels.values().find_map(|l| l.puzzle::<T>())
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Seconds spent in levels and scenes (menus and pause excluded).
    pub fn play_time(&self) -> f64 {
        self.play_time
    }
}
