//! Game configuration loaded from JSON.
//!
//! Every field has a default, so a partial (or empty) document is valid.
//! [`GameConfig::validate`] rejects settings that would make the game
//! unwinnable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::KEY_COUNT;
use crate::puzzles::{BillSimulatorConfig, CableWiringConfig, KitchenConfig, TvSequenceConfig};
use crate::quiz::QuizConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("could not parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Keys needed before the final level activates.
    pub required_keys: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_keys: crate::constants::DEFAULT_REQUIRED_KEYS,
        }
    }
}

/// One narration line played `at_secs` after the scene starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationBeat {
    pub key: String,
    pub at_secs: f32,
}

impl NarrationBeat {
    pub fn new(key: &str, at_secs: f32) -> Self {
        Self {
            key: key.to_string(),
            at_secs,
        }
    }
}

/// Timed narration for a cutscene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneScript {
    pub beats: Vec<NarrationBeat>,
    /// Scene length; the scene ends this long after it starts.
    pub duration_secs: f32,
}

impl Default for SceneScript {
    fn default() -> Self {
        Self {
            beats: Vec::new(),
            duration_secs: 0.0,
        }
    }
}

impl SceneScript {
    pub fn opening() -> Self {
        Self {
            beats: vec![
                NarrationBeat::new("opening_blackout", 0.0),
                NarrationBeat::new("opening_guide_intro", 4.0),
                NarrationBeat::new("opening_keys", 9.0),
            ],
            duration_secs: 14.0,
        }
    }

    pub fn ending() -> Self {
        Self {
            beats: vec![
                NarrationBeat::new("ending_lights_on", 0.0),
                NarrationBeat::new("ending_thanks", 5.0),
            ],
            duration_secs: 10.0,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.duration_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{} scene duration must be >= 0",
                name
            )));
        }
        if let Some(beat) = self
            .beats
            .iter()
            .find(|b| b.at_secs < 0.0 || b.at_secs > self.duration_secs)
        {
            return Err(ConfigError::Invalid(format!(
                "{} beat '{}' at {:.1}s is outside the scene",
                name, beat.key, beat.at_secs
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub cable: CableWiringConfig,
    pub tv: TvSequenceConfig,
    pub kitchen: KitchenConfig,
    pub bill: BillSimulatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub quiz: QuizConfig,
    pub gate: GateConfig,
    pub opening: SceneScript,
    pub ending: SceneScript,
    pub levels: LevelsConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            quiz: QuizConfig::default(),
            gate: GateConfig::default(),
            opening: SceneScript::opening(),
            ending: SceneScript::ending(),
            levels: LevelsConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let quiz = &self.quiz;
        if quiz.session_size == 0 {
            return Err(ConfigError::Invalid("quiz session_size must be >= 1".into()));
        }
        if !(quiz.seconds_per_question > 0.0) {
            return Err(ConfigError::Invalid(
                "quiz seconds_per_question must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&quiz.pass_percentage) {
            return Err(ConfigError::Invalid(format!(
                "quiz pass_percentage {} outside 0..=100",
                quiz.pass_percentage
            )));
        }
        if self.gate.required_keys > KEY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "gate requires {} keys but only {} exist",
                self.gate.required_keys, KEY_COUNT
            )));
        }
        self.opening.validate("opening")?;
        self.ending.validate("ending")?;
        self.levels.tv.validate()?;
        self.levels.kitchen.validate()?;
        self.levels.bill.validate()?;
        // Cable wiring validates its terminal graph on construction
        Ok(())
    }
}
