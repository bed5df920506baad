//! Integration tests for the progression pipeline.
//!
//! Exercises: StateMachine → LevelOrchestrator → puzzles → ProgressStore,
//! ending with the gated quiz level.
//!
//! All tests are pure logic: no engine loop, no files.

use wattwise_logic::constants::{sfx, FINAL_KEY_INDEX, KEY_COUNT};
use wattwise_logic::feedback::RecordingFeedback;
use wattwise_logic::level::{GateError, LevelOrchestrator, LevelSpec, LevelTick};
use wattwise_logic::progress::{MemoryBackend, ProgressStore};
use wattwise_logic::puzzle::{ManualPuzzle, PuzzleController, TickContext};
use wattwise_logic::puzzles::{CableWiringConfig, CableWiringPuzzle};
use wattwise_logic::quiz::{QuizConfig, QuizEngine, QuizPhase, QuizQuestion};
use wattwise_logic::state::{GameState, StateMachine};

// ── Helpers ────────────────────────────────────────────────────────────

fn bank(n: usize) -> Vec<QuizQuestion> {
    (0..n)
        .map(|i| QuizQuestion {
            text: format!("How many watts, case {}?", i),
            options: [
                "10".to_string(),
                "20".to_string(),
                "30".to_string(),
                "40".to_string(),
            ],
            correct_index: i % 4,
            explanation: "Watts measure power.".to_string(),
            category: if i % 2 == 0 { "units" } else { "safety" }.to_string(),
        })
        .collect()
}

fn quiz() -> QuizEngine {
    let config = QuizConfig {
        seed: Some(11),
        ..Default::default()
    };
    QuizEngine::new(bank(12), config).unwrap()
}

fn level(n: u8, puzzles: Vec<Box<dyn PuzzleController>>) -> LevelOrchestrator {
    LevelOrchestrator::new(LevelSpec::standard(n, 3).unwrap(), puzzles)
}

fn manual_level(n: u8) -> LevelOrchestrator {
    level(n, vec![Box::new(ManualPuzzle::new(format!("level{}", n)))])
}

fn tick(
    level: &mut LevelOrchestrator,
    machine: &mut StateMachine,
    progress: &mut ProgressStore,
    feedback: &mut RecordingFeedback,
    dt: f32,
) -> LevelTick {
    let mut ctx = TickContext::new(dt, progress, feedback);
    level.update(&mut ctx, machine)
}

/// Enter `level`, solve its manual puzzle and tick once.
fn clear_manual(
    level: &mut LevelOrchestrator,
    machine: &mut StateMachine,
    progress: &mut ProgressStore,
    feedback: &mut RecordingFeedback,
) {
    level.enter(progress).unwrap();
    level.puzzle_mut::<ManualPuzzle>().unwrap().solve();
    tick(level, machine, progress, feedback, 0.016);
}

fn answer_all(quiz: &mut QuizEngine, correct: usize) {
    let total = quiz.session().unwrap().len();
    for i in 0..total {
        let right = quiz
            .session()
            .unwrap()
            .current_question()
            .unwrap()
            .correct_index;
        quiz.answer(if i < correct { right } else { (right + 3) % 4 });
    }
}

// ── Level chain ────────────────────────────────────────────────────────

#[test]
fn cable_level_hands_over_to_level_two() {
    let mut machine = StateMachine::new(GameState::MainMenu);
    let mut progress = ProgressStore::in_memory();
    let mut feedback = RecordingFeedback::new();
    let cable = CableWiringPuzzle::new(&CableWiringConfig::default()).unwrap();
    let mut level1 = level(1, vec![Box::new(cable)]);

    machine.change_state(GameState::Level1);
    level1.enter(&progress).unwrap();

    let puzzle = level1.puzzle_mut::<CableWiringPuzzle>().unwrap();
    puzzle.connect("battery+", "switch");
    puzzle.connect("switch", "bulb");
    assert!(matches!(
        tick(&mut level1, &mut machine, &mut progress, &mut feedback, 0.016),
        LevelTick::Playing {
            completed: 0,
            total: 1
        }
    ));

    let puzzle = level1.puzzle_mut::<CableWiringPuzzle>().unwrap();
    puzzle.connect("bulb", "battery-");
    puzzle.toggle_switch();
    let outcome = tick(&mut level1, &mut machine, &mut progress, &mut feedback, 0.016);

    assert!(matches!(outcome, LevelTick::Completed(Some(t)) if t.to == GameState::Level2));
    assert_eq!(machine.current_state(), GameState::Level2);
    assert!(progress.keys().is_collected(0));
    assert_eq!(progress.current_level(), 2);
    assert_eq!(
        tick(&mut level1, &mut machine, &mut progress, &mut feedback, 0.016),
        LevelTick::Done
    );
}

#[test]
fn three_levels_unlock_the_gate() {
    let mut machine = StateMachine::new(GameState::Level1);
    let mut progress = ProgressStore::in_memory();
    let mut feedback = RecordingFeedback::new();
    let mut level4 = level(4, vec![Box::new(quiz())]);

    assert_eq!(
        level4.check_gate(&progress),
        Err(GateError::MissingKeys {
            collected: 0,
            required: 3
        })
    );

    for n in 1..=3 {
        let mut lvl = manual_level(n);
        clear_manual(&mut lvl, &mut machine, &mut progress, &mut feedback);
        if n < 3 {
            assert!(level4.check_gate(&progress).is_err());
        }
    }

    assert_eq!(machine.current_state(), GameState::Level4);
    assert_eq!(progress.keys_collected(), 3);
    assert!(level4.enter(&progress).is_ok());
    assert_eq!(
        level4.puzzle::<QuizEngine>().unwrap().phase(),
        QuizPhase::InProgress
    );
}

#[test]
fn gate_keeps_quiz_idle_without_keys() {
    let mut progress = ProgressStore::in_memory();
    progress.collect_key(0);
    progress.collect_key(2);
    let mut level4 = level(4, vec![Box::new(quiz())]);

    assert!(level4.enter(&progress).is_err());
    assert!(!level4.is_active());
    assert_eq!(level4.puzzle::<QuizEngine>().unwrap().phase(), QuizPhase::Idle);
}

// ── Quiz level ─────────────────────────────────────────────────────────

#[test]
fn passing_quiz_finishes_the_game() {
    let mut machine = StateMachine::new(GameState::Level4);
    let mut progress = ProgressStore::in_memory();
    let mut feedback = RecordingFeedback::new();
    for key in 0..3 {
        progress.collect_key(key);
    }
    progress.complete_level(3);

    let mut level4 = level(4, vec![Box::new(quiz())]);
    level4.enter(&progress).unwrap();
    answer_all(level4.puzzle_mut::<QuizEngine>().unwrap(), 8);

    let outcome = tick(&mut level4, &mut machine, &mut progress, &mut feedback, 0.016);
    assert!(matches!(outcome, LevelTick::Completed(Some(_))));
    assert_eq!(machine.current_state(), GameState::EndingScene);
    assert!(progress.keys().is_collected(FINAL_KEY_INDEX));
    assert_eq!(progress.keys_collected(), KEY_COUNT);
    assert!(progress.game_completed());
    assert!(feedback.sfx().contains(&sfx::KEY_COLLECTED));
    assert!(feedback.has_message_containing("80%"));
}

#[test]
fn failing_quiz_keeps_the_level_open() {
    let mut machine = StateMachine::new(GameState::Level4);
    let mut progress = ProgressStore::in_memory();
    let mut feedback = RecordingFeedback::new();
    for key in 0..3 {
        progress.collect_key(key);
    }

    let mut level4 = level(4, vec![Box::new(quiz())]);
    level4.enter(&progress).unwrap();
    answer_all(level4.puzzle_mut::<QuizEngine>().unwrap(), 6);
    let outcome = tick(&mut level4, &mut machine, &mut progress, &mut feedback, 0.016);

    assert!(matches!(outcome, LevelTick::Playing { completed: 0, .. }));
    assert_eq!(machine.current_state(), GameState::Level4);
    assert!(!progress.game_completed());
    assert!(feedback.has_message_containing("need 70%"));

    // Retry on the same level, then pass
    let quiz = level4.puzzle_mut::<QuizEngine>().unwrap();
    quiz.retry().unwrap();
    answer_all(quiz, 10);
    tick(&mut level4, &mut machine, &mut progress, &mut feedback, 0.016);
    assert_eq!(machine.current_state(), GameState::EndingScene);
}

// ── Pause and persistence ──────────────────────────────────────────────

#[test]
fn pause_returns_to_the_same_level() {
    let mut machine = StateMachine::new(GameState::MainMenu);
    machine.change_state(GameState::Level3);
    machine.change_state(GameState::Paused);
    assert_eq!(machine.previous_state(), GameState::Level3);

    let back = machine.resume_from_pause().unwrap();
    assert_eq!(back.to, GameState::Level3);
    assert!(machine.resume_from_pause().is_none());
}

#[test]
fn progress_is_shared_through_the_backend() {
    let backend = MemoryBackend::new();
    let mut machine = StateMachine::new(GameState::Level1);
    let mut feedback = RecordingFeedback::new();
    {
        let mut progress = ProgressStore::open(Box::new(backend.clone()));
        for n in 1..=2 {
            let mut lvl = manual_level(n);
            clear_manual(&mut lvl, &mut machine, &mut progress, &mut feedback);
        }
    }

    let progress = ProgressStore::open(Box::new(backend.clone()));
    assert_eq!(progress.current_level(), 3);
    assert_eq!(progress.keys_collected(), 2);
    assert!(progress.is_level_unlocked(3));
    assert!(!progress.is_level_unlocked(4));
}

#[test]
fn replaying_a_level_fires_again_without_a_second_key() {
    let mut machine = StateMachine::new(GameState::Level1);
    let mut progress = ProgressStore::in_memory();
    let mut feedback = RecordingFeedback::new();
    let mut level1 = manual_level(1);

    clear_manual(&mut level1, &mut machine, &mut progress, &mut feedback);
    machine.change_state(GameState::Level1);
    clear_manual(&mut level1, &mut machine, &mut progress, &mut feedback);

    assert_eq!(machine.current_state(), GameState::Level2);
    assert_eq!(progress.keys_collected(), 1);
    let key_cues = feedback
        .sfx()
        .into_iter()
        .filter(|s| *s == sfx::KEY_COLLECTED)
        .count();
    assert_eq!(key_cues, 1);
}
