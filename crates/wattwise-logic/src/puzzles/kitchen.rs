//! Level 3a: run the kitchen efficiently.
//!
//! Each appliance has a standard and an energy-efficient model. The player
//! switches appliances on and off and swaps in efficient models. Pushing the
//! total load past the breaker limit trips the breaker and everything goes
//! off. The puzzle completes when every essential appliance is running and
//! the total load is within the efficiency target.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::sfx;
use crate::feedback::FeedbackQueue;
use crate::puzzle::{PuzzleController, TickContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceSpec {
    pub name: String,
    pub standard_watts: f32,
    pub efficient_watts: f32,
    /// Must be running for the kitchen to count as working.
    pub essential: bool,
}

impl ApplianceSpec {
    pub fn new(name: &str, standard_watts: f32, efficient_watts: f32, essential: bool) -> Self {
        Self {
            name: name.to_string(),
            standard_watts,
            efficient_watts,
            essential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    pub appliances: Vec<ApplianceSpec>,
    /// Load above this trips the breaker.
    pub breaker_limit_watts: f32,
    /// Load at or below this counts as efficient.
    pub target_watts: f32,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            appliances: vec![
                ApplianceSpec::new("fridge", 250.0, 120.0, true),
                ApplianceSpec::new("oven", 2400.0, 1800.0, true),
                ApplianceSpec::new("lights", 300.0, 40.0, true),
                ApplianceSpec::new("kettle", 2200.0, 1500.0, false),
                ApplianceSpec::new("dishwasher", 1800.0, 1100.0, false),
            ],
            breaker_limit_watts: 3500.0,
            target_watts: 2000.0,
        }
    }
}

impl KitchenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.appliances.is_empty() {
            return Err(ConfigError::Invalid("kitchen has no appliances".into()));
        }
        for a in &self.appliances {
            if a.efficient_watts <= 0.0 || a.efficient_watts > a.standard_watts {
                return Err(ConfigError::Invalid(format!(
                    "appliance '{}' efficient model must draw less than standard",
                    a.name
                )));
            }
        }
        if self.target_watts > self.breaker_limit_watts {
            return Err(ConfigError::Invalid(
                "kitchen target must not exceed the breaker limit".into(),
            ));
        }
        let best_essential: f32 = self
            .appliances
            .iter()
            .filter(|a| a.essential)
            .map(|a| a.efficient_watts)
            .sum();
        if best_essential > self.target_watts {
            return Err(ConfigError::Invalid(format!(
                "kitchen unsolvable: essentials need {:.0} W, target is {:.0} W",
                best_essential, self.target_watts
            )));
        }
        Ok(())
    }
}

/// Result of a kitchen action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenOutcome {
    Applied,
    BreakerTripped,
    AlreadyEfficient,
    UnknownAppliance,
    Inactive,
}

#[derive(Debug, Clone, Copy, Default)]
struct ApplianceState {
    running: bool,
    efficient: bool,
}

pub struct KitchenEfficiencyPuzzle {
    config: KitchenConfig,
    states: Vec<ApplianceState>,
    breaker_trips: u32,
    active: bool,
    completed: bool,
    outbox: FeedbackQueue,
}

impl KitchenEfficiencyPuzzle {
    pub fn new(config: &KitchenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            states: vec![ApplianceState::default(); config.appliances.len()],
            breaker_trips: 0,
            active: false,
            completed: false,
            outbox: FeedbackQueue::new(),
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.config.appliances.iter().position(|a| a.name == name)
    }

    /// Switch an appliance on or off.
    pub fn toggle(&mut self, name: &str) -> KitchenOutcome {
        if !self.active {
            return KitchenOutcome::Inactive;
        }
        let Some(i) = self.index_of(name) else {
            return KitchenOutcome::UnknownAppliance;
        };
        self.states[i].running = !self.states[i].running;

        if self.load_watts() > self.config.breaker_limit_watts {
            self.trip_breaker();
            return KitchenOutcome::BreakerTripped;
        }
        self.evaluate();
        KitchenOutcome::Applied
    }

    /// Replace an appliance with its efficient model.
    pub fn upgrade(&mut self, name: &str) -> KitchenOutcome {
        if !self.active {
            return KitchenOutcome::Inactive;
        }
        let Some(i) = self.index_of(name) else {
            return KitchenOutcome::UnknownAppliance;
        };
        if self.states[i].efficient {
            return KitchenOutcome::AlreadyEfficient;
        }
        self.states[i].efficient = true;
        self.evaluate();
        KitchenOutcome::Applied
    }

    fn trip_breaker(&mut self) {
        for s in &mut self.states {
            s.running = false;
        }
        self.breaker_trips += 1;
        log::debug!("Kitchen breaker tripped ({} total)", self.breaker_trips);
        self.outbox.sfx(sfx::BREAKER_TRIP);
        self.outbox.message(
            format!(
                "The breaker tripped! Keep the load under {:.0} W.",
                self.config.breaker_limit_watts
            ),
            false,
            3.0,
        );
    }

    /// Current total draw of running appliances.
    pub fn load_watts(&self) -> f32 {
        self.config
            .appliances
            .iter()
            .zip(&self.states)
            .filter(|(_, s)| s.running)
            .map(|(a, s)| {
                if s.efficient {
                    a.efficient_watts
                } else {
                    a.standard_watts
                }
            })
            .sum()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.index_of(name).is_some_and(|i| self.states[i].running)
    }

    pub fn is_efficient(&self, name: &str) -> bool {
        self.index_of(name).is_some_and(|i| self.states[i].efficient)
    }

    pub fn breaker_trips(&self) -> u32 {
        self.breaker_trips
    }

    pub fn target_watts(&self) -> f32 {
        self.config.target_watts
    }

    pub fn essentials_running(&self) -> bool {
        self.config
            .appliances
            .iter()
            .zip(&self.states)
            .filter(|(a, _)| a.essential)
            .all(|(_, s)| s.running)
    }

    fn evaluate(&mut self) {
        if self.completed {
            return;
        }
        if self.essentials_running() && self.load_watts() <= self.config.target_watts {
            self.completed = true;
            log::info!(
                "Kitchen efficient at {:.0} W ({} breaker trip(s))",
                self.load_watts(),
                self.breaker_trips
            );
            self.outbox.message(
                format!("Efficient kitchen: {:.0} W", self.load_watts()),
                true,
                3.0,
            );
        }
    }
}

impl PuzzleController for KitchenEfficiencyPuzzle {
    fn name(&self) -> &str {
        "kitchen_efficiency"
    }

    fn activate(&mut self) {
        self.active = true;
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
        self.states.iter_mut().for_each(|s| *s = ApplianceState::default());
        self.breaker_trips = 0;
        self.completed = false;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> KitchenEfficiencyPuzzle {
        let mut p = KitchenEfficiencyPuzzle::new(&KitchenConfig::default()).unwrap();
        p.activate();
        p
    }

    #[test]
    fn test_standard_models_too_hungry() {
        let mut p = kitchen();
        p.toggle("fridge");
        p.toggle("lights");
        assert_eq!(p.toggle("oven"), KitchenOutcome::Applied);
        assert!((p.load_watts() - 2950.0).abs() < 0.1);
        assert!(!p.is_completed());
    }

    #[test]
    fn test_upgrades_complete_the_kitchen() {
        let mut p = kitchen();
        for name in ["fridge", "oven", "lights"] {
            assert_eq!(p.upgrade(name), KitchenOutcome::Applied);
        }
        p.toggle("fridge");
        p.toggle("lights");
        assert!(!p.is_completed(), "oven still off");
        p.toggle("oven");
        assert!((p.load_watts() - 1960.0).abs() < 0.1);
        assert!(p.is_completed());
    }

    #[test]
    fn test_breaker_trip_turns_everything_off() {
        let mut p = kitchen();
        p.toggle("oven");
        assert_eq!(p.toggle("kettle"), KitchenOutcome::BreakerTripped);
        assert_eq!(p.load_watts(), 0.0);
        assert!(!p.is_running("oven"));
        assert_eq!(p.breaker_trips(), 1);
    }

    #[test]
    fn test_upgrade_twice_and_unknown() {
        let mut p = kitchen();
        p.upgrade("kettle");
        assert_eq!(p.upgrade("kettle"), KitchenOutcome::AlreadyEfficient);
        assert_eq!(p.toggle("toaster"), KitchenOutcome::UnknownAppliance);
    }

    #[test]
    fn test_reset_restores_standard_models() {
        let mut p = kitchen();
        p.upgrade("oven");
        p.toggle("oven");
        p.reset_state();
        assert!(!p.is_efficient("oven"));
        assert!(!p.is_running("oven"));
        assert!(!p.is_completed());
    }

    #[test]
    fn test_unsolvable_config_rejected() {
        let config = KitchenConfig {
            target_watts: 500.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
