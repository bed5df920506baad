//! Level 3b: bring the monthly electricity bill under budget.
//!
//! The player sets how many hours a day each appliance runs, then submits.
//! Monthly bill = Σ kW × hours/day × 30 × tariff. A submitted bill at or below
//! the target completes the puzzle.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{sfx, BILLING_DAYS};
use crate::feedback::FeedbackQueue;
use crate::puzzle::{PuzzleController, TickContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillApplianceSpec {
    pub name: String,
    pub watts: f32,
    pub default_hours: f32,
    /// The player cannot go below this (the fridge runs all day).
    pub min_hours: f32,
}

impl BillApplianceSpec {
    pub fn new(name: &str, watts: f32, default_hours: f32, min_hours: f32) -> Self {
        Self {
            name: name.to_string(),
            watts,
            default_hours,
            min_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillSimulatorConfig {
    pub appliances: Vec<BillApplianceSpec>,
    /// Currency units per kWh.
    pub tariff_per_kwh: f32,
    pub target_bill: f32,
}

impl Default for BillSimulatorConfig {
    fn default() -> Self {
        Self {
            appliances: vec![
                BillApplianceSpec::new("fridge", 150.0, 24.0, 24.0),
                BillApplianceSpec::new("air_conditioner", 1500.0, 8.0, 0.0),
                BillApplianceSpec::new("water_heater", 2000.0, 3.0, 0.5),
                BillApplianceSpec::new("tv", 120.0, 6.0, 0.0),
                BillApplianceSpec::new("lights", 200.0, 6.0, 2.0),
            ],
            tariff_per_kwh: 0.20,
            target_bill: 90.0,
        }
    }
}

impl BillSimulatorConfig {
    /// Bill with every appliance at its minimum hours.
    pub fn minimum_bill(&self) -> f32 {
        self.appliances
            .iter()
            .map(|a| monthly_cost(a.watts, a.min_hours, self.tariff_per_kwh))
            .sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.appliances.is_empty() {
            return Err(ConfigError::Invalid("bill simulator has no appliances".into()));
        }
        if self.tariff_per_kwh <= 0.0 {
            return Err(ConfigError::Invalid("tariff must be positive".into()));
        }
        for a in &self.appliances {
            if !(0.0..=24.0).contains(&a.min_hours) || a.default_hours < a.min_hours {
                return Err(ConfigError::Invalid(format!(
                    "appliance '{}' has invalid hours",
                    a.name
                )));
            }
        }
        if self.minimum_bill() > self.target_bill {
            return Err(ConfigError::Invalid(format!(
                "bill target {:.2} below the minimum possible bill {:.2}",
                self.target_bill,
                self.minimum_bill()
            )));
        }
        Ok(())
    }
}

fn monthly_cost(watts: f32, hours_per_day: f32, tariff: f32) -> f32 {
    watts / 1000.0 * hours_per_day * BILLING_DAYS * tariff
}

/// Result of submitting the bill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BillOutcome {
    Accepted { bill: f32 },
    OverTarget { bill: f32, target: f32 },
    Inactive,
}

pub struct BillSimulatorPuzzle {
    config: BillSimulatorConfig,
    hours: Vec<f32>,
    attempts: u32,
    active: bool,
    completed: bool,
    outbox: FeedbackQueue,
}

impl BillSimulatorPuzzle {
    pub fn new(config: &BillSimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            hours: config.appliances.iter().map(|a| a.default_hours).collect(),
            attempts: 0,
            active: false,
            completed: false,
            outbox: FeedbackQueue::new(),
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.config.appliances.iter().position(|a| a.name == name)
    }

    /// Set daily hours, clamped to `[min_hours, 24]`. Returns the applied
    /// value, or `None` for unknown appliances or while inactive.
    pub fn set_hours(&mut self, name: &str, hours: f32) -> Option<f32> {
        if !self.active {
            return None;
        }
        let i = self.index_of(name)?;
        let min = self.config.appliances[i].min_hours;
        let hours = if hours.is_nan() { min } else { hours.clamp(min, 24.0) };
        self.hours[i] = hours;
        Some(hours)
    }

    pub fn adjust_hours(&mut self, name: &str, delta: f32) -> Option<f32> {
        let current = self.hours(name)?;
        self.set_hours(name, current + delta)
    }

    pub fn hours(&self, name: &str) -> Option<f32> {
        self.index_of(name).map(|i| self.hours[i])
    }

    pub fn daily_kwh(&self) -> f32 {
        self.config
            .appliances
            .iter()
            .zip(&self.hours)
            .map(|(a, h)| a.watts / 1000.0 * h)
            .sum()
    }

    pub fn monthly_bill(&self) -> f32 {
        self.config
            .appliances
            .iter()
            .zip(&self.hours)
            .map(|(a, h)| monthly_cost(a.watts, *h, self.config.tariff_per_kwh))
            .sum()
    }

    /// Appliances by monthly cost, most expensive first.
    pub fn cost_breakdown(&self) -> Vec<(&str, f32)> {
        let mut rows: Vec<(&str, f32)> = self
            .config
            .appliances
            .iter()
            .zip(&self.hours)
            .map(|(a, h)| {
                (
                    a.name.as_str(),
                    monthly_cost(a.watts, *h, self.config.tariff_per_kwh),
                )
            })
            .collect();
        rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rows
    }

    pub fn target_bill(&self) -> f32 {
        self.config.target_bill
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn submit(&mut self) -> BillOutcome {
        if !self.active {
            return BillOutcome::Inactive;
        }
        self.attempts += 1;
        let bill = self.monthly_bill();
        let target = self.config.target_bill;

        if bill <= target {
            if !self.completed {
                self.completed = true;
                log::info!(
                    "Bill accepted at {:.2} after {} attempt(s)",
                    bill,
                    self.attempts
                );
            }
            self.outbox.message(
                format!("Monthly bill {:.2} is within budget!", bill),
                true,
                3.0,
            );
            BillOutcome::Accepted { bill }
        } else {
            self.outbox.sfx(sfx::DENIED);
            let biggest = self
                .cost_breakdown()
                .first()
                .map(|(name, _)| name.to_string())
                .unwrap_or_default();
            self.outbox.message(
                format!(
                    "Bill {:.2} is over the {:.2} budget. Biggest cost: {}",
                    bill, target, biggest
                ),
                false,
                3.0,
            );
            BillOutcome::OverTarget { bill, target }
        }
    }
}

impl PuzzleController for BillSimulatorPuzzle {
    fn name(&self) -> &str {
        "bill_simulator"
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
        self.hours = self
            .config
            .appliances
            .iter()
            .map(|a| a.default_hours)
            .collect();
        self.attempts = 0;
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
