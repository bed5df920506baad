//! Game state machine.
//!
//! Holds the current [`GameState`], runs enter/exit hooks on the handler
//! registered for each state and notifies transition listeners. Handlers are
//! looked up in an explicit map built once at startup by
//! [`StateMachineBuilder`]; a state without a handler is legal and simply has
//! no hooks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::LEVEL_COUNT;

// ============================================================================
// STATES
// ============================================================================

/// Every scene or screen the game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    OpeningScene,
    MainMenu,
    Level1,
    Level2,
    Level3,
    Level4,
    EndingScene,
    Settings,
    About,
    Paused,
}

impl GameState {
    pub const ALL: [GameState; 10] = [
        GameState::OpeningScene,
        GameState::MainMenu,
        GameState::Level1,
        GameState::Level2,
        GameState::Level3,
        GameState::Level4,
        GameState::EndingScene,
        GameState::Settings,
        GameState::About,
        GameState::Paused,
    ];

    /// Level number (1-based) for level states.
    pub fn level_number(self) -> Option<u8> {
        match self {
            Self::Level1 => Some(1),
            Self::Level2 => Some(2),
            Self::Level3 => Some(3),
            Self::Level4 => Some(4),
            _ => None,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Level1),
            2 => Some(Self::Level2),
            3 => Some(Self::Level3),
            4 => Some(Self::Level4),
            _ => None,
        }
    }

    pub fn is_level(self) -> bool {
        self.level_number().is_some()
    }

    /// State that follows a completed level.
    pub fn after_level(level: u8) -> Option<Self> {
        if level >= LEVEL_COUNT {
            (level == LEVEL_COUNT).then_some(Self::EndingScene)
        } else {
            Self::from_level(level + 1)
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Lifecycle hooks for one state (scene loading, music, menus).
///
/// Hooks must not panic: a panic here is a wiring bug and is not caught.
pub trait StateHandler {
    fn on_enter(&mut self, _previous: GameState) {}
    fn on_exit(&mut self, _next: GameState) {}
}

/// Callback invoked with `(previous, next)` after every transition.
pub type TransitionListener = Box<dyn FnMut(GameState, GameState)>;

/// Returned by [`StateMachine::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

/// A completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: GameState,
    pub to: GameState,
}

/// Errors raised while wiring the game at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("a handler is already registered for {0:?}")]
    DuplicateHandler(GameState),
    #[error("{0:?} is not a level state")]
    NotALevel(GameState),
    #[error("a level is already registered for {0:?}")]
    DuplicateLevel(GameState),
    #[error("level {0} does not exist")]
    UnknownLevel(u8),
}

// ============================================================================
// MACHINE
// ============================================================================

pub struct StateMachineBuilder {
    initial: GameState,
    handlers: HashMap<GameState, Box<dyn StateHandler>>,
}

impl StateMachineBuilder {
    pub fn new(initial: GameState) -> Self {
        Self {
            initial,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for `state`. Each state takes at most one.
    pub fn register(
        mut self,
        state: GameState,
        handler: Box<dyn StateHandler>,
    ) -> Result<Self, SetupError> {
        if self.handlers.contains_key(&state) {
            return Err(SetupError::DuplicateHandler(state));
        }
        self.handlers.insert(state, handler);
        Ok(self)
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            current: self.initial,
            previous: self.initial,
            handlers: self.handlers,
            listeners: Vec::new(),
            next_subscription: 0,
            transition_count: 0,
        }
    }
}

/// Finite state machine over [`GameState`].
pub struct StateMachine {
    current: GameState,
    previous: GameState,
    handlers: HashMap<GameState, Box<dyn StateHandler>>,
    listeners: Vec<(SubscriptionId, TransitionListener)>,
    next_subscription: u32,
    transition_count: u64,
}

impl StateMachine {
    /// Machine with no handlers.
    pub fn new(initial: GameState) -> Self {
        StateMachineBuilder::new(initial).build()
    }

    pub fn builder(initial: GameState) -> StateMachineBuilder {
        StateMachineBuilder::new(initial)
    }

    pub fn current_state(&self) -> GameState {
        self.current
    }

    /// State before the last transition (equals current before any transition).
    pub fn previous_state(&self) -> GameState {
        self.previous
    }

    /// Number of transitions performed so far.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn has_handler(&self, state: GameState) -> bool {
        self.handlers.contains_key(&state)
    }

    /// Move to `next`.
    ///
    /// Does nothing when `next` is already current. Otherwise runs the
    /// current handler's `on_exit`, swaps states, runs the new handler's
    /// `on_enter` and then notifies listeners.
    pub fn change_state(&mut self, next: GameState) -> Option<Transition> {
        if next == self.current {
            return None;
        }

        let from = self.current;
        if let Some(handler) = self.handlers.get_mut(&from) {
            handler.on_exit(next);
        }

        self.previous = from;
        self.current = next;
        self.transition_count += 1;

        if let Some(handler) = self.handlers.get_mut(&next) {
            handler.on_enter(from);
        }

        for (_, listener) in self.listeners.iter_mut() {
            listener(from, next);
        }

        log::info!("State {:?} -> {:?}", from, next);
        Some(Transition { from, to: next })
    }

    /// Return to the state that was active before pausing.
    ///
    /// Only meaningful while [`GameState::Paused`] is current; otherwise a no-op.
    pub fn resume_from_pause(&mut self) -> Option<Transition> {
        if self.current != GameState::Paused {
            log::debug!("resume_from_pause ignored in {:?}", self.current);
            return None;
        }
        let target = self.previous;
        self.change_state(target)
    }

    pub fn subscribe(&mut self, listener: TransitionListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }
}
