//! Game data bundled into the binary.

use wattwise_logic::config::{ConfigError, GameConfig};
use wattwise_logic::quiz::{parse_question_bank, QuizError, QuizQuestion};

pub const GAME_CONFIG_JSON: &str = include_str!("../../../data/game_config.json");
pub const QUIZ_BANK_JSON: &str = include_str!("../../../data/quiz_bank.json");

pub fn bundled_config() -> Result<GameConfig, ConfigError> {
    GameConfig::from_json(GAME_CONFIG_JSON)
}

pub fn bundled_question_bank() -> Result<Vec<QuizQuestion>, QuizError> {
    parse_question_bank(QUIZ_BANK_JSON)
}
