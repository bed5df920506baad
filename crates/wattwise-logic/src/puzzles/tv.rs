//! Level 2: get the living-room TV working.
//!
//! Plug in, power on, wait for the set to warm up, then tune to the hidden
//! broadcast channel. Once the screen is on and the channel matches, a signal
//! lock runs for a short delay; the puzzle completes when it finishes.
//! Retuning, powering off, unplugging, deactivating or resetting cancels the
//! pending lock.

use std::any::Any;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::sfx;
use crate::feedback::FeedbackQueue;
use crate::puzzle::{PuzzleController, TickContext};
use crate::timing::{TaskHandle, TaskQueue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TvSequenceConfig {
    /// Channels are numbered `1..=channel_count`.
    pub channel_count: u32,
    /// Fixed broadcast channel; random on every reset when `None`.
    pub hidden_channel: Option<u32>,
    pub warm_up_secs: f32,
    pub lock_delay_secs: f32,
}

impl Default for TvSequenceConfig {
    fn default() -> Self {
        Self {
            channel_count: 12,
            hidden_channel: None,
            warm_up_secs: 1.0,
            lock_delay_secs: 2.0,
        }
    }
}

impl TvSequenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count < 2 {
            return Err(ConfigError::Invalid("TV needs at least 2 channels".into()));
        }
        if let Some(ch) = self.hidden_channel {
            if ch == 0 || ch > self.channel_count {
                return Err(ConfigError::Invalid(format!(
                    "hidden channel {} outside 1..={}",
                    ch, self.channel_count
                )));
            }
        }
        if self.warm_up_secs < 0.0 || self.lock_delay_secs < 0.0 {
            return Err(ConfigError::Invalid("TV delays must be >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TvTask {
    WarmUpDone,
    SignalLocked,
}

/// Result of pressing the power button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    WarmingUp,
    PoweredOff,
    NoPower,
    Inactive,
}

pub struct TvSequencePuzzle {
    config: TvSequenceConfig,
    rng: StdRng,
    hidden_channel: u32,
    plugged_in: bool,
    powered: bool,
    screen_on: bool,
    channel: u32,
    lock: Option<TaskHandle>,
    tasks: TaskQueue<TvTask>,
    active: bool,
    completed: bool,
    outbox: FeedbackQueue,
}

impl TvSequencePuzzle {
    pub fn new(config: &TvSequenceConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut puzzle = Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(seed),
            hidden_channel: 1,
            plugged_in: false,
            powered: false,
            screen_on: false,
            channel: 1,
            lock: None,
            tasks: TaskQueue::new(),
            active: false,
            completed: false,
            outbox: FeedbackQueue::new(),
        };
        puzzle.pick_hidden_channel();
        Ok(puzzle)
    }

    fn pick_hidden_channel(&mut self) {
        self.hidden_channel = match self.config.hidden_channel {
            Some(ch) => ch,
            // Never the channel the set starts on
            None => self.rng.gen_range(2..=self.config.channel_count),
        };
    }

    pub fn plug_in(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.plugged_in = true;
        true
    }

    pub fn unplug(&mut self) {
        if !self.active {
            return;
        }
        self.plugged_in = false;
        self.shut_down();
    }

    pub fn press_power(&mut self) -> PowerOutcome {
        if !self.active {
            return PowerOutcome::Inactive;
        }
        if !self.plugged_in {
            self.outbox.sfx(sfx::DENIED);
            self.outbox
                .message("Nothing happens. Is the TV plugged in?", false, 2.0);
            return PowerOutcome::NoPower;
        }
        if self.powered {
            self.shut_down();
            return PowerOutcome::PoweredOff;
        }
        self.powered = true;
        self.tasks.schedule(self.config.warm_up_secs, TvTask::WarmUpDone);
        PowerOutcome::WarmingUp
    }

    pub fn channel_up(&mut self) -> u32 {
        let next = if self.channel >= self.config.channel_count {
            1
        } else {
            self.channel + 1
        };
        self.set_channel(next)
    }

    pub fn channel_down(&mut self) -> u32 {
        let next = if self.channel <= 1 {
            self.config.channel_count
        } else {
            self.channel - 1
        };
        self.set_channel(next)
    }

    /// Tune directly. Out-of-range values are clamped.
    pub fn set_channel(&mut self, channel: u32) -> u32 {
        if !self.active {
            return self.channel;
        }
        let channel = channel.clamp(1, self.config.channel_count);
        if channel != self.channel {
            self.channel = channel;
            self.cancel_lock();
            self.check_tuning();
        }
        self.channel
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn hidden_channel(&self) -> u32 {
        self.hidden_channel
    }

    pub fn is_plugged_in(&self) -> bool {
        self.plugged_in
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_screen_on(&self) -> bool {
        self.screen_on
    }

    pub fn is_locking(&self) -> bool {
        self.lock.is_some_and(|h| self.tasks.is_pending(h))
    }

    /// 1.0 on the broadcast channel, falling off with dial distance.
    /// Zero while the screen is off.
    pub fn signal_strength(&self) -> f32 {
        if !self.screen_on {
            return 0.0;
        }
        let n = self.config.channel_count;
        let diff = self.channel.abs_diff(self.hidden_channel);
        let distance = diff.min(n - diff) as f32;
        let max_distance = (n / 2).max(1) as f32;
        (1.0 - distance / max_distance).max(0.0)
    }

    fn shut_down(&mut self) {
        self.powered = false;
        self.screen_on = false;
        self.lock = None;
        self.tasks.cancel_all();
    }

    fn cancel_lock(&mut self) {
        if let Some(handle) = self.lock.take() {
            self.tasks.cancel(handle);
        }
    }

    fn check_tuning(&mut self) {
        if self.completed || !self.screen_on || self.channel != self.hidden_channel {
            return;
        }
        if self.lock.is_none() {
            self.outbox.sfx(sfx::TV_STATIC);
            self.lock = Some(
                self.tasks
                    .schedule(self.config.lock_delay_secs, TvTask::SignalLocked),
            );
        }
    }

    fn run(&mut self, task: TvTask) {
        match task {
            TvTask::WarmUpDone => {
                self.screen_on = true;
                self.check_tuning();
            }
            TvTask::SignalLocked => {
                self.lock = None;
                if !self.completed {
                    self.completed = true;
                    log::info!("TV tuned to channel {}", self.hidden_channel);
                    self.outbox
                        .message("Picture's clear! The broadcast is on.", true, 3.0);
                }
            }
        }
    }

    /// Advance timers without a full tick context.
    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.tasks.advance(dt);
        while let Some(task) = self.tasks.pop_due() {
            self.run(task);
        }
    }
}

impl PuzzleController for TvSequencePuzzle {
    fn name(&self) -> &str {
        "tv_sequence"
    }

    fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.plugged_in = false;
        self.channel = 1;
        self.shut_down();
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.shut_down();
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn reset_state(&mut self) {
        self.shut_down();
        self.plugged_in = false;
        self.channel = 1;
        self.completed = false;
        self.outbox.clear();
        self.pick_hidden_channel();
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.advance(ctx.dt);
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

    fn puzzle_on(hidden: u32) -> TvSequencePuzzle {
        let config = TvSequenceConfig {
            hidden_channel: Some(hidden),
            ..Default::default()
        };
        let mut p = TvSequencePuzzle::new(&config, 7).unwrap();
        p.activate();
        p
    }

    fn power_up(p: &mut TvSequencePuzzle) {
        p.plug_in();
        assert_eq!(p.press_power(), PowerOutcome::WarmingUp);
        p.advance(1.0);
        assert!(p.is_screen_on());
    }

    #[test]
    fn test_full_sequence_completes_after_lock() {
        let mut p = puzzle_on(5);
        power_up(&mut p);
        p.set_channel(5);
        assert!(p.is_locking());
        p.advance(1.0);
        assert!(!p.is_completed());
        p.advance(1.0);
        assert!(p.is_completed());
    }

    #[test]
    fn test_needs_power() {
        let mut p = puzzle_on(3);
        assert_eq!(p.press_power(), PowerOutcome::NoPower);
        p.set_channel(3);
        p.advance(10.0);
        assert!(!p.is_completed());
    }

    #[test]
    fn test_tuned_before_warm_up_locks_after_screen_on() {
        let mut p = puzzle_on(4);
        p.plug_in();
        p.press_power();
        p.set_channel(4);
        assert!(!p.is_locking());
        p.advance(1.0);
        assert!(p.is_locking());
        p.advance(2.0);
        assert!(p.is_completed());
    }

    #[test]
    fn test_retune_cancels_lock() {
        let mut p = puzzle_on(6);
        power_up(&mut p);
        p.set_channel(6);
        p.advance(1.5);
        p.channel_up();
        p.advance(5.0);
        assert!(!p.is_completed());
    }

    #[test]
    fn test_reset_cancels_pending_lock() {
        let mut p = puzzle_on(2);
        power_up(&mut p);
        p.channel_up();
        assert!(p.is_locking());
        p.reset_state();
        p.advance(5.0);
        assert!(!p.is_completed());
        assert!(!p.is_locking());
    }

    #[test]
    fn test_deactivate_cancels_pending_lock() {
        let mut p = puzzle_on(2);
        power_up(&mut p);
        p.channel_up();
        p.deactivate();
        p.activate();
        p.advance(5.0);
        assert!(!p.is_completed());
        assert!(!p.is_powered());
    }

    #[test]
    fn test_unplug_shuts_down() {
        let mut p = puzzle_on(2);
        power_up(&mut p);
        p.unplug();
        assert!(!p.is_powered());
        assert!(!p.is_screen_on());
        assert_eq!(p.signal_strength(), 0.0);
    }

    #[test]
    fn test_channel_wraps_and_signal_strength() {
        let mut p = puzzle_on(12);
        power_up(&mut p);
        assert_eq!(p.channel_down(), 12);
        assert_eq!(p.signal_strength(), 1.0);
        assert_eq!(p.channel_up(), 1);
        assert!(p.signal_strength() > 0.8);
        assert_eq!(p.set_channel(99), 12);
    }

    #[test]
    fn test_random_hidden_channel_in_range() {
        let config = TvSequenceConfig::default();
        for seed in 0..50 {
            let p = TvSequencePuzzle::new(&config, seed).unwrap();
            assert!((2..=config.channel_count).contains(&p.hidden_channel()));
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = TvSequenceConfig {
            hidden_channel: Some(13),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
