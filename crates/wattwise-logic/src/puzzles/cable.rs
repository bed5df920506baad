//! Level 1: wire a simple household circuit.
//!
//! The player drags cables between terminals and flips the wall switch. The
//! puzzle completes when every required connection exists and the switch is
//! on. There is no path tracing: "all required connections made" is the
//! whole rule.

use std::any::Any;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::sfx;
use crate::feedback::FeedbackQueue;
use crate::puzzle::{PuzzleController, TickContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableWiringConfig {
    pub terminals: Vec<String>,
    /// Unordered terminal pairs that must be wired.
    pub required: Vec<(String, String)>,
}

impl Default for CableWiringConfig {
    fn default() -> Self {
        let t = |s: &str| s.to_string();
        Self {
            terminals: vec![t("battery+"), t("battery-"), t("switch"), t("bulb")],
            required: vec![
                (t("battery+"), t("switch")),
                (t("switch"), t("bulb")),
                (t("bulb"), t("battery-")),
            ],
        }
    }
}

/// Result of a wiring action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOutcome {
    Connected,
    AlreadyConnected,
    /// The pair is not part of the circuit.
    NotAllowed,
    UnknownTerminal,
    /// Picked up a cable end, waiting for the other terminal.
    Holding,
    Inactive,
}

type Edge = (usize, usize);

fn edge(a: usize, b: usize) -> Edge {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub struct CableWiringPuzzle {
    terminals: Vec<String>,
    required: BTreeSet<Edge>,
    connections: BTreeSet<Edge>,
    switch_on: bool,
    /// Terminal whose cable end is in hand.
    held: Option<usize>,
    active: bool,
    completed: bool,
    mistakes: u32,
    outbox: FeedbackQueue,
}

impl CableWiringPuzzle {
    pub fn new(config: &CableWiringConfig) -> Result<Self, ConfigError> {
        if config.required.is_empty() {
            return Err(ConfigError::Invalid(
                "cable wiring needs at least one required connection".into(),
            ));
        }
        let index_of = |name: &str| {
            config
                .terminals
                .iter()
                .position(|t| t == name)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown terminal '{}'", name)))
        };

        let mut required = BTreeSet::new();
        for (a, b) in &config.required {
            let (ia, ib) = (index_of(a)?, index_of(b)?);
            if ia == ib {
                return Err(ConfigError::Invalid(format!(
                    "terminal '{}' cannot be wired to itself",
                    a
                )));
            }
            required.insert(edge(ia, ib));
        }

        Ok(Self {
            terminals: config.terminals.clone(),
            required,
            connections: BTreeSet::new(),
            switch_on: false,
            held: None,
            active: false,
            completed: false,
            mistakes: 0,
            outbox: FeedbackQueue::new(),
        })
    }

    fn terminal(&self, name: &str) -> Option<usize> {
        self.terminals.iter().position(|t| t == name)
    }

    /// Pick up the cable end at `terminal`.
    pub fn grab(&mut self, terminal: &str) -> WireOutcome {
        if !self.active {
            return WireOutcome::Inactive;
        }
        match self.terminal(terminal) {
            Some(i) => {
                self.held = Some(i);
                WireOutcome::Holding
            }
            None => WireOutcome::UnknownTerminal,
        }
    }

    /// Drop the held cable end on `terminal`.
    pub fn release_on(&mut self, terminal: &str) -> WireOutcome {
        if !self.active {
            return WireOutcome::Inactive;
        }
        let Some(from) = self.held.take() else {
            return WireOutcome::UnknownTerminal;
        };
        let from = self.terminals[from].clone();
        self.connect(&from, terminal)
    }

    pub fn connect(&mut self, a: &str, b: &str) -> WireOutcome {
        if !self.active {
            return WireOutcome::Inactive;
        }
        let (Some(ia), Some(ib)) = (self.terminal(a), self.terminal(b)) else {
            return WireOutcome::UnknownTerminal;
        };
        let e = edge(ia, ib);
        if !self.required.contains(&e) {
            self.mistakes += 1;
            self.outbox.sfx(sfx::SPARK);
            self.outbox
                .message(format!("{} and {} don't belong together", a, b), false, 2.0);
            return WireOutcome::NotAllowed;
        }
        if !self.connections.insert(e) {
            return WireOutcome::AlreadyConnected;
        }
        self.evaluate();
        WireOutcome::Connected
    }

    pub fn disconnect(&mut self, a: &str, b: &str) -> bool {
        if !self.active {
            return false;
        }
        match (self.terminal(a), self.terminal(b)) {
            (Some(ia), Some(ib)) => self.connections.remove(&edge(ia, ib)),
            _ => false,
        }
    }

    /// Flip the wall switch. Returns the new switch position.
    pub fn toggle_switch(&mut self) -> bool {
        if !self.active {
            return self.switch_on;
        }
        self.switch_on = !self.switch_on;
        self.outbox.sfx(sfx::SWITCH);
        if self.switch_on && !self.all_connected() {
            self.outbox.message(
                format!(
                    "The bulb stays dark: {} connection(s) missing",
                    self.missing_connections().len()
                ),
                false,
                2.0,
            );
        }
        self.evaluate();
        self.switch_on
    }

    pub fn is_switch_on(&self) -> bool {
        self.switch_on
    }

    pub fn held_terminal(&self) -> Option<&str> {
        self.held.map(|i| self.terminals[i].as_str())
    }

    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    pub fn required_count(&self) -> usize {
        self.required.len()
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn all_connected(&self) -> bool {
        self.required.is_subset(&self.connections)
    }

    /// Required pairs not yet wired, by terminal name.
    pub fn missing_connections(&self) -> Vec<(&str, &str)> {
        self.required
            .difference(&self.connections)
            .map(|(a, b)| (self.terminals[*a].as_str(), self.terminals[*b].as_str()))
            .collect()
    }

    fn evaluate(&mut self) {
        if self.completed || !self.switch_on || !self.all_connected() {
            return;
        }
        self.completed = true;
        log::info!("Cable wiring solved with {} mistake(s)", self.mistakes);
        self.outbox.message("The bulb lights up!", true, 3.0);
    }
}

impl PuzzleController for CableWiringPuzzle {
    fn name(&self) -> &str {
        "cable_wiring"
    }

    fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.held = None;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.held = None;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn reset_state(&mut self) {
        self.connections.clear();
        self.switch_on = false;
        self.held = None;
        self.completed = false;
        self.mistakes = 0;
        self.outbox.clear();
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.outbox.flush(ctx.feedback);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
