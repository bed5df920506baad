//! Fixed game constants shared by every module.

/// Number of energy keys (one per level).
pub const KEY_COUNT: usize = 4;

/// Number of playable levels.
pub const LEVEL_COUNT: u8 = 4;

/// Level that hosts the gate and the final quiz.
pub const FINAL_LEVEL: u8 = 4;

/// Key collected by passing the final quiz.
pub const FINAL_KEY_INDEX: usize = 3;

/// Keys required before the final gate opens.
pub const DEFAULT_REQUIRED_KEYS: usize = 3;

/// Options shown for every quiz question.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Minimum score (inclusive) for a passing quiz session.
pub const DEFAULT_PASS_PERCENTAGE: f32 = 70.0;

/// Days used by the bill simulator to turn daily usage into a monthly bill.
pub const BILLING_DAYS: f32 = 30.0;

/// Sound effect names passed to the audio collaborator.
pub mod sfx {
    pub const KEY_COLLECTED: &str = "key_collected";
    pub const LEVEL_COMPLETE: &str = "level_complete";
    pub const CORRECT: &str = "correct";
    pub const INCORRECT: &str = "incorrect";
    pub const TIMEOUT: &str = "timeout";
    pub const DENIED: &str = "denied";
    pub const SPARK: &str = "spark";
    pub const SWITCH: &str = "switch";
    pub const BREAKER_TRIP: &str = "breaker_trip";
    pub const TV_STATIC: &str = "tv_static";
}
