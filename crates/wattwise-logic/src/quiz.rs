//! Final evaluation: a randomized, timed multiple-choice quiz.
//!
//! A session draws `session_size` questions from the bank with a Fisher-Yates
//! shuffle over every bank index, keeping the first `session_size`. Each
//! question runs a countdown; running out counts as a wrong answer. After the
//! last question the session moves to scoring, which happens on the next
//! tick: `score = correct × 100 / total`, passing at 70 % or more (inclusive).
//! A pass collects the final energy key and completes the puzzle.
//!
//! Session phases: `Idle → InProgress → Scoring → Finished(pass | fail)`.

use std::any::Any;
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{sfx, DEFAULT_PASS_PERCENTAGE, FINAL_KEY_INDEX, QUIZ_OPTION_COUNT};
use crate::feedback::FeedbackQueue;
use crate::progress::ProgressStore;
use crate::puzzle::{PuzzleController, TickContext};
use crate::timing::Countdown;

/// Redraws attempted when a retry would repeat the previous subset.
const MAX_REDRAWS: usize = 8;

// ============================================================================
// QUESTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub text: String,
    pub options: [String; QUIZ_OPTION_COUNT],
    pub correct_index: usize,
    pub explanation: String,
    pub category: String,
}

impl QuizQuestion {
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".into());
        }
        if self.correct_index >= QUIZ_OPTION_COUNT {
            return Err(format!(
                "correct_index {} outside 0..{}",
                self.correct_index, QUIZ_OPTION_COUNT
            ));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err("an option is empty".into());
        }
        Ok(())
    }

    /// Text of the correct option. `None` for an unvalidated question whose
    /// index is out of range.
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("session size must be at least 1")]
    EmptySession,
    #[error("session size {requested} exceeds bank size {available}")]
    SessionTooLarge { requested: usize, available: usize },
    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: String },
    #[error("could not parse question bank: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for QuizError {
    fn from(e: serde_json::Error) -> Self {
        QuizError::Parse(e.to_string())
    }
}

/// Parse and validate a JSON array of questions.
pub fn parse_question_bank(json: &str) -> Result<Vec<QuizQuestion>, QuizError> {
    let bank: Vec<QuizQuestion> = serde_json::from_str(json)?;
    validate_bank(&bank)?;
    Ok(bank)
}

pub fn validate_bank(bank: &[QuizQuestion]) -> Result<(), QuizError> {
    if bank.is_empty() {
        return Err(QuizError::EmptyBank);
    }
    for (index, q) in bank.iter().enumerate() {
        q.validate()
            .map_err(|reason| QuizError::InvalidQuestion { index, reason })?;
    }
    Ok(())
}

/// Pick `session_size` distinct bank indices uniformly at random.
///
/// Shuffles the full index range (Fisher-Yates via `SliceRandom::shuffle`)
/// and keeps the prefix, so the result does not depend on bank order.
pub fn draw_indices<R: Rng + ?Sized>(
    bank_len: usize,
    session_size: usize,
    rng: &mut R,
) -> Result<Vec<usize>, QuizError> {
    if bank_len == 0 {
        return Err(QuizError::EmptyBank);
    }
    if session_size == 0 {
        return Err(QuizError::EmptySession);
    }
    if session_size > bank_len {
        return Err(QuizError::SessionTooLarge {
            requested: session_size,
            available: bank_len,
        });
    }
    let mut indices: Vec<usize> = (0..bank_len).collect();
    indices.shuffle(rng);
    indices.truncate(session_size);
    Ok(indices)
}

// ============================================================================
// SESSION
// ============================================================================

/// How one question went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Position in the session.
    pub question: usize,
    /// `None` when the timer ran out.
    pub selected: Option<usize>,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect { correct_index: usize },
    TimedOut { correct_index: usize },
    /// Already answered, session not running, or quiz inactive.
    Ignored,
}

/// One attempt, from shuffle to last answer.
#[derive(Debug, Clone)]
pub struct QuizSession {
    bank_indices: Vec<usize>,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    correct_count: usize,
    answers: Vec<AnswerRecord>,
    deadline: Countdown,
}

impl QuizSession {
    /// Draw a session from `bank` and start the first question's timer.
    pub fn start<R: Rng + ?Sized>(
        bank: &[QuizQuestion],
        session_size: usize,
        seconds_per_question: f32,
        rng: &mut R,
    ) -> Result<Self, QuizError> {
        let bank_indices = draw_indices(bank.len(), session_size, rng)?;
        Ok(Self::from_indices(bank, bank_indices, seconds_per_question))
    }

    fn from_indices(bank: &[QuizQuestion], bank_indices: Vec<usize>, seconds_per_question: f32) -> Self {
        let questions = bank_indices.iter().map(|i| bank[*i].clone()).collect();
        let mut deadline = Countdown::new(seconds_per_question);
        deadline.start();
        Self {
            bank_indices,
            questions,
            current_index: 0,
            correct_count: 0,
            answers: Vec::new(),
            deadline,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn bank_indices(&self) -> &[usize] {
        &self.bank_indices
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    pub fn time_remaining(&self) -> f32 {
        self.deadline.remaining()
    }

    pub fn time_fraction_remaining(&self) -> f32 {
        self.deadline.fraction_remaining()
    }

    /// Answer whichever question is showing.
    pub fn answer(&mut self, selected: usize) -> AnswerOutcome {
        self.answer_question(self.current_index, selected)
    }

    /// Answer question `question`. Ignored unless it is the one showing, so a
    /// double submit from the UI cannot spill into the next question.
    pub fn answer_question(&mut self, question: usize, selected: usize) -> AnswerOutcome {
        if question != self.current_index || self.is_finished() {
            return AnswerOutcome::Ignored;
        }
        self.record(Some(selected))
    }

    /// Advance the per-question timer; a timeout records a wrong answer.
    pub fn tick(&mut self, dt: f32) -> Option<AnswerOutcome> {
        if self.is_finished() {
            return None;
        }
        if self.deadline.tick(dt) {
            return Some(self.record(None));
        }
        None
    }

    fn record(&mut self, selected: Option<usize>) -> AnswerOutcome {
        let correct_index = self.questions[self.current_index].correct_index;
        let correct = selected == Some(correct_index);
        self.answers.push(AnswerRecord {
            question: self.current_index,
            selected,
            correct,
        });
        if correct {
            self.correct_count += 1;
        }
        self.current_index += 1;

        if self.is_finished() {
            self.deadline.stop();
        } else {
            self.deadline.start();
        }

        match (selected, correct) {
            (_, true) => AnswerOutcome::Correct,
            (Some(_), false) => AnswerOutcome::Incorrect { correct_index },
            (None, false) => AnswerOutcome::TimedOut { correct_index },
        }
    }

    /// `correct × 100 / total`; multiplying first keeps 7/10 at exactly 70.
    pub fn score_percentage(&self) -> f32 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.correct_count as f32 * 100.0) / self.questions.len() as f32
    }

    /// `(correct, asked)` per category over the answered questions.
    pub fn category_breakdown(&self) -> BTreeMap<String, (usize, usize)> {
        let mut out: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for record in &self.answers {
            let entry = out
                .entry(self.questions[record.question].category.clone())
                .or_default();
            entry.1 += 1;
            if record.correct {
                entry.0 += 1;
            }
        }
        out
    }

    fn pause_timer(&mut self) {
        self.deadline.stop();
    }

    fn restart_timer(&mut self) {
        if !self.is_finished() {
            self.deadline.start();
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub session_size: usize,
    pub seconds_per_question: f32,
    pub pass_percentage: f32,
    /// Fixed RNG seed for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            session_size: 10,
            seconds_per_question: 20.0,
            pass_percentage: DEFAULT_PASS_PERCENTAGE,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score_percentage: f32,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuizPhase {
    Idle,
    InProgress,
    Scoring,
    Finished(QuizResult),
}

/// The quiz as a puzzle.
pub struct QuizEngine {
    bank: Vec<QuizQuestion>,
    config: QuizConfig,
    rng: StdRng,
    phase: QuizPhase,
    session: Option<QuizSession>,
    previous_selection: Option<Vec<usize>>,
    last_error: Option<QuizError>,
    attempts: u32,
    active: bool,
    outbox: FeedbackQueue,
}

impl QuizEngine {
    /// Build over a validated bank. Session size is checked when a session
    /// starts, not here.
    pub fn new(bank: Vec<QuizQuestion>, config: QuizConfig) -> Result<Self, QuizError> {
        validate_bank(&bank)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            bank,
            config,
            rng,
            phase: QuizPhase::Idle,
            session: None,
            previous_selection: None,
            last_error: None,
            attempts: 0,
            active: false,
            outbox: FeedbackQueue::new(),
        })
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn bank(&self) -> &[QuizQuestion] {
        &self.bank
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn result(&self) -> Option<QuizResult> {
        match self.phase {
            QuizPhase::Finished(result) => Some(result),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&QuizError> {
        self.last_error.as_ref()
    }

    /// Sessions started so far (including retries).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Draw a new session and show the first question.
    ///
    /// On a retry with spare questions in the bank, a draw that repeats the
    /// previous subset is redrawn. A configuration error leaves the quiz
    /// idle and is reported to the UI.
    pub fn start_session(&mut self) -> Result<(), QuizError> {
        let bank_len = self.bank.len();
        let size = self.config.session_size;

        let mut indices = match draw_indices(bank_len, size, &mut self.rng) {
            Ok(indices) => indices,
            Err(e) => {
                log::error!("Quiz session not started: {}", e);
                self.outbox
                    .message(format!("Quiz unavailable: {}", e), false, 4.0);
                self.phase = QuizPhase::Idle;
                self.session = None;
                self.last_error = Some(e.clone());
                return Err(e);
            }
        };

        if bank_len > size {
            for _ in 0..MAX_REDRAWS {
                if !self.repeats_previous(&indices) {
                    break;
                }
                indices = draw_indices(bank_len, size, &mut self.rng)?;
            }
        }

        let mut sorted = indices.clone();
        sorted.sort_unstable();
        self.previous_selection = Some(sorted);

        self.session = Some(QuizSession::from_indices(
            &self.bank,
            indices,
            self.config.seconds_per_question,
        ));
        self.phase = QuizPhase::InProgress;
        self.last_error = None;
        self.attempts += 1;
        log::info!("Quiz session {} started with {} questions", self.attempts, size);
        Ok(())
    }

    fn repeats_previous(&self, indices: &[usize]) -> bool {
        let Some(previous) = &self.previous_selection else {
            return false;
        };
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        &sorted == previous
    }

    /// Answer the showing question.
    pub fn answer(&mut self, selected: usize) -> AnswerOutcome {
        let Some(question) = self.session.as_ref().map(|s| s.current_index()) else {
            return AnswerOutcome::Ignored;
        };
        self.answer_question(question, selected)
    }

    /// Answer session question `question`; ignored unless it is showing.
    pub fn answer_question(&mut self, question: usize, selected: usize) -> AnswerOutcome {
        if !self.active || self.phase != QuizPhase::InProgress {
            return AnswerOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return AnswerOutcome::Ignored;
        };
        let explanation = session
            .current_question()
            .map(|q| q.explanation.clone())
            .unwrap_or_default();
        let outcome = session.answer_question(question, selected);
        self.after_answer(outcome, &explanation);
        outcome
    }

    fn after_answer(&mut self, outcome: AnswerOutcome, explanation: &str) {
        match outcome {
            AnswerOutcome::Ignored => return,
            AnswerOutcome::Correct => {
                self.outbox.sfx(sfx::CORRECT);
                self.outbox
                    .message(format!("Correct! {}", explanation), true, 2.5);
            }
            AnswerOutcome::Incorrect { .. } => {
                self.outbox.sfx(sfx::INCORRECT);
                self.outbox
                    .message(format!("Not quite. {}", explanation), false, 2.5);
            }
            AnswerOutcome::TimedOut { .. } => {
                self.outbox.sfx(sfx::TIMEOUT);
                self.outbox
                    .message(format!("Time's up! {}", explanation), false, 2.5);
            }
        }
        log::debug!("Quiz answer: {:?}", outcome);

        if self.session.as_ref().is_some_and(|s| s.is_finished()) {
            self.phase = QuizPhase::Scoring;
        }
    }

    /// Score a completed session. Only acts in [`QuizPhase::Scoring`].
    /// A pass collects the final energy key.
    pub fn finish_session(&mut self, progress: &mut ProgressStore) -> Option<QuizResult> {
        if self.phase != QuizPhase::Scoring {
            return None;
        }
        let session = self.session.as_ref()?;
        let score_percentage = session.score_percentage();
        let result = QuizResult {
            correct: session.correct_count(),
            total: session.len(),
            score_percentage,
            passed: score_percentage >= self.config.pass_percentage,
        };
        self.phase = QuizPhase::Finished(result);

        log::info!(
            "Quiz finished: {}/{} ({:.1}%) {}",
            result.correct,
            result.total,
            result.score_percentage,
            if result.passed { "PASS" } else { "FAIL" }
        );

        if result.passed {
            if progress.collect_key(FINAL_KEY_INDEX).is_some() {
                self.outbox.sfx(sfx::KEY_COLLECTED);
            }
            self.outbox.message(
                format!(
                    "You scored {:.0}%! The final energy key is yours.",
                    result.score_percentage
                ),
                true,
                4.0,
            );
        } else {
            self.outbox.message(
                format!(
                    "You scored {:.0}%. You need {:.0}% to pass. Try again!",
                    result.score_percentage, self.config.pass_percentage
                ),
                false,
                4.0,
            );
        }
        Some(result)
    }

    /// Reset and, if active, start a fresh session.
    pub fn retry(&mut self) -> Result<(), QuizError> {
        self.reset_state();
        match &self.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Advance timers and scoring without a full tick context.
    pub fn advance(&mut self, dt: f32, progress: &mut ProgressStore) {
        if !self.active {
            return;
        }
        if self.phase == QuizPhase::InProgress {
            let timed_out = self.session.as_mut().and_then(|s| {
                let explanation = s
                    .current_question()
                    .map(|q| q.explanation.clone())
                    .unwrap_or_default();
                s.tick(dt).map(|outcome| (outcome, explanation))
            });
            if let Some((outcome, explanation)) = timed_out {
                self.after_answer(outcome, &explanation);
            }
        }
        if self.phase == QuizPhase::Scoring {
            self.finish_session(progress);
        }
    }
}

impl PuzzleController for QuizEngine {
    fn name(&self) -> &str {
        "quiz"
    }

    fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        match self.phase {
            QuizPhase::Idle => {
                // Failure is recorded in last_error and shown to the player
                let _ = self.start_session();
            }
            QuizPhase::InProgress => {
                if let Some(session) = self.session.as_mut() {
                    session.restart_timer();
                }
            }
            QuizPhase::Scoring | QuizPhase::Finished(_) => {}
        }
    }

    fn deactivate(&mut self) {
        self.active = false;
        if let Some(session) = self.session.as_mut() {
            session.pause_timer();
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_completed(&self) -> bool {
        matches!(self.phase, QuizPhase::Finished(r) if r.passed)
    }

    /// Back to idle. An active quiz draws a fresh session straight away.
    fn reset_state(&mut self) {
        self.phase = QuizPhase::Idle;
        self.session = None;
        self.last_error = None;
        self.outbox.clear();
        if self.active {
            // Failure is recorded in last_error and shown to the player
            let _ = self.start_session();
        }
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.advance(ctx.dt, ctx.progress);
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
    use std::collections::HashSet;

    fn question(i: usize) -> QuizQuestion {
        QuizQuestion {
            text: format!("Question {}", i),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            correct_index: i % 4,
            explanation: format!("Because {}", i),
            category: if i % 2 == 0 { "safety" } else { "energy" }.to_string(),
        }
    }

    fn bank(n: usize) -> Vec<QuizQuestion> {
        (0..n).map(question).collect()
    }

    fn seeded(bank_size: usize, session_size: usize) -> QuizEngine {
        QuizEngine::new(
            bank(bank_size),
            QuizConfig {
                session_size,
                seconds_per_question: 10.0,
                seed: Some(42),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn answer_n_correct(quiz: &mut QuizEngine, correct: usize) {
        let total = quiz.session().unwrap().len();
        for i in 0..total {
            let right = quiz.session().unwrap().current_question().unwrap().correct_index;
            let pick = if i < correct { right } else { (right + 1) % 4 };
            quiz.answer(pick);
        }
    }

    #[test]
    fn test_draw_distinct_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let picked = draw_indices(20, 10, &mut rng).unwrap();
            assert_eq!(picked.len(), 10);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 10);
            assert!(picked.iter().all(|i| *i < 20));
        }
    }

    #[test]
    fn test_draw_orderings_vary() {
        let mut rng = StdRng::seed_from_u64(9);
        let draws: HashSet<Vec<usize>> = (0..20)
            .map(|_| draw_indices(10, 10, &mut rng).unwrap())
            .collect();
        assert!(draws.len() > 15);
    }

    #[test]
    fn test_draw_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut counts = [0usize; 10];
        let trials = 5000;
        for _ in 0..trials {
            for i in draw_indices(10, 3, &mut rng).unwrap() {
                counts[i] += 1;
            }
        }
        // Expected 1500 each
        for c in counts {
            assert!((1300..1700).contains(&c), "count {} far from 1500", c);
        }
    }

    #[test]
    fn test_draw_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            draw_indices(5, 6, &mut rng),
            Err(QuizError::SessionTooLarge {
                requested: 6,
                available: 5
            })
        ));
        assert!(matches!(draw_indices(5, 0, &mut rng), Err(QuizError::EmptySession)));
        assert!(matches!(draw_indices(0, 1, &mut rng), Err(QuizError::EmptyBank)));
    }

    #[test]
    fn test_score_boundary_passes() {
        let mut quiz = seeded(12, 10);
        quiz.activate();
        answer_n_correct(&mut quiz, 7);
        assert_eq!(quiz.phase(), QuizPhase::Scoring);

        let mut progress = ProgressStore::in_memory();
        let result = quiz.finish_session(&mut progress).unwrap();
        assert_eq!(result.score_percentage, 70.0);
        assert!(result.passed);
        assert!(quiz.is_completed());
        assert!(progress.keys().is_collected(FINAL_KEY_INDEX));
    }

    #[test]
    fn test_below_threshold_fails() {
        let mut quiz = seeded(12, 10);
        quiz.activate();
        answer_n_correct(&mut quiz, 6);
        let mut progress = ProgressStore::in_memory();
        let result = quiz.finish_session(&mut progress).unwrap();
        assert_eq!(result.score_percentage, 60.0);
        assert!(!result.passed);
        assert!(!quiz.is_completed());
        assert_eq!(progress.keys_collected(), 0);
    }

    #[test]
    fn test_answer_once_per_question() {
        let mut quiz = seeded(10, 5);
        quiz.activate();
        let right = quiz.session().unwrap().current_question().unwrap().correct_index;
        assert_eq!(quiz.answer_question(0, right), AnswerOutcome::Correct);
        assert_eq!(quiz.answer_question(0, right), AnswerOutcome::Ignored);
        let session = quiz.session().unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn test_timeout_counts_as_wrong_and_advances_once() {
        let mut quiz = seeded(10, 3);
        quiz.activate();
        let mut progress = ProgressStore::in_memory();

        quiz.advance(9.0, &mut progress);
        assert_eq!(quiz.session().unwrap().current_index(), 0);

        // Overshooting the deadline still only skips one question
        quiz.advance(25.0, &mut progress);
        let session = quiz.session().unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.correct_count(), 0);
        assert_eq!(
            session.answers()[0],
            AnswerRecord {
                question: 0,
                selected: None,
                correct: false
            }
        );
        assert!((session.time_remaining() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_timeout_matches_wrong_answer_effects() {
        let mut by_timeout = seeded(10, 2);
        let mut by_wrong = seeded(10, 2);
        by_timeout.activate();
        by_wrong.activate();
        let mut progress = ProgressStore::in_memory();

        by_timeout.advance(10.0, &mut progress);
        let right = by_wrong.session().unwrap().current_question().unwrap().correct_index;
        by_wrong.answer((right + 1) % 4);

        let (a, b) = (by_timeout.session().unwrap(), by_wrong.session().unwrap());
        assert_eq!(a.current_index(), b.current_index());
        assert_eq!(a.correct_count(), b.correct_count());
        assert_eq!(a.time_remaining(), b.time_remaining());
    }

    #[test]
    fn test_scoring_happens_on_tick() {
        let mut quiz = seeded(10, 2);
        quiz.activate();
        answer_n_correct(&mut quiz, 2);
        let mut progress = ProgressStore::in_memory();
        quiz.advance(0.016, &mut progress);
        assert!(quiz.is_completed());
        assert_eq!(quiz.result().map(|r| r.correct), Some(2));
        assert!(progress.keys().is_collected(FINAL_KEY_INDEX));
    }

    #[test]
    fn test_session_too_large_reported_not_started() {
        let mut quiz = seeded(5, 10);
        quiz.activate();
        assert_eq!(quiz.phase(), QuizPhase::Idle);
        assert!(matches!(
            quiz.last_error(),
            Some(QuizError::SessionTooLarge { .. })
        ));
        assert_eq!(quiz.answer(0), AnswerOutcome::Ignored);
    }

    #[test]
    fn test_oversize_retry_keeps_error() {
        let mut quiz = seeded(5, 10);
        quiz.activate();
        assert_eq!(
            quiz.retry(),
            Err(QuizError::SessionTooLarge {
                requested: 10,
                available: 5
            })
        );
        assert!(quiz.last_error().is_some());
        assert_eq!(quiz.attempts(), 0);
    }

    #[test]
    fn test_reset_state_after_failure_starts_new_session() {
        let mut quiz = seeded(12, 10);
        quiz.activate();
        answer_n_correct(&mut quiz, 1);
        let mut progress = ProgressStore::in_memory();
        quiz.finish_session(&mut progress);
        assert!(matches!(quiz.phase(), QuizPhase::Finished(r) if !r.passed));

        quiz.reset_state();
        quiz.activate();
        assert_eq!(quiz.phase(), QuizPhase::InProgress);
        assert_eq!(quiz.attempts(), 2);
        let right = quiz.session().unwrap().current_question().unwrap().correct_index;
        assert_eq!(quiz.answer(right), AnswerOutcome::Correct);
    }

    #[test]
    fn test_reset_state_while_inactive_stays_idle() {
        let mut quiz = seeded(12, 10);
        quiz.activate();
        quiz.deactivate();
        quiz.reset_state();
        assert_eq!(quiz.phase(), QuizPhase::Idle);
        assert!(quiz.session().is_none());

        quiz.activate();
        assert_eq!(quiz.phase(), QuizPhase::InProgress);
    }

    #[test]
    fn test_correct_option_out_of_range() {
        let mut q = question(0);
        assert_eq!(q.correct_option(), Some(q.options[q.correct_index].as_str()));
        q.correct_index = 9;
        assert_eq!(q.correct_option(), None);
    }

    #[test]
    fn test_retry_draws_fresh_subset() {
        let mut quiz = seeded(12, 10);
        quiz.activate();
        for _ in 0..10 {
            let first: Vec<usize> = quiz.session().unwrap().bank_indices().to_vec();
            answer_n_correct(&mut quiz, 0);
            let mut progress = ProgressStore::in_memory();
            quiz.finish_session(&mut progress);
            assert!(!quiz.is_completed());

            quiz.retry().unwrap();
            let mut a = first.clone();
            let mut b = quiz.session().unwrap().bank_indices().to_vec();
            a.sort_unstable();
            b.sort_unstable();
            assert_ne!(a, b);
        }
        assert_eq!(quiz.attempts(), 11);
    }

    #[test]
    fn test_deactivate_pauses_timer() {
        let mut quiz = seeded(10, 3);
        quiz.activate();
        quiz.deactivate();
        let mut progress = ProgressStore::in_memory();
        quiz.advance(100.0, &mut progress);
        assert_eq!(quiz.session().unwrap().current_index(), 0);
        assert_eq!(quiz.answer(0), AnswerOutcome::Ignored);

        quiz.activate();
        assert_eq!(quiz.phase(), QuizPhase::InProgress);
        assert!((quiz.session().unwrap().time_remaining() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_category_breakdown() {
        let mut quiz = seeded(10, 4);
        quiz.activate();
        answer_n_correct(&mut quiz, 4);
        let breakdown = quiz.session().unwrap().category_breakdown();
        let asked: usize = breakdown.values().map(|(_, n)| n).sum();
        let correct: usize = breakdown.values().map(|(c, _)| c).sum();
        assert_eq!(asked, 4);
        assert_eq!(correct, 4);
    }

    #[test]
    fn test_bank_validation() {
        let mut bad = bank(3);
        bad[1].correct_index = 4;
        assert!(matches!(
            QuizEngine::new(bad, QuizConfig::default()),
            Err(QuizError::InvalidQuestion { index: 1, .. })
        ));
        assert!(matches!(
            parse_question_bank("[]"),
            Err(QuizError::EmptyBank)
        ));
        assert!(matches!(parse_question_bank("{"), Err(QuizError::Parse(_))));
    }
}
