//! WattWise Headless Play Harness
//!
//! Validates bundled data and plays scripted runs through the real engine.
//! Runs entirely in-process: no rendering, no audio, no save files.
//!
//! Usage:
//!   cargo run -p wattwise-simtest
//!   cargo run -p wattwise-simtest -- --verbose --seed 7
//!   RUST_LOG=debug cargo run -p wattwise-simtest

use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use wattwise_core::data::{bundled_config, bundled_question_bank};
use wattwise_core::prelude::*;
use wattwise_logic::config::GameConfig;
use wattwise_logic::constants::{DEFAULT_PASS_PERCENTAGE, KEY_COUNT};
use wattwise_logic::level::{GateError, LevelOrchestrator, LevelSpec};
use wattwise_logic::progress::MemoryBackend;
use wattwise_logic::quiz::{draw_indices, QuizConfig, QuizQuestion};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

struct Args {
    verbose: bool,
    seed: u64,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    Args { verbose, seed }
}

fn main() {
    env_logger::init();
    let args = parse_args();
    println!("=== WattWise Play Harness (seed {}) ===\n", args.seed);

    let mut results = Vec::new();

    // 1. Bundled data
    let data = validate_bundled_data(args.verbose, &mut results);

    if let Some((config, bank)) = data {
        // 2. Quiz draw sweep
        results.extend(validate_quiz_draws(args.verbose, &bank, args.seed));

        // 3. Scoring boundary
        results.extend(validate_scoring(args.verbose, &bank, args.seed));

        // 4. Scripted full run
        results.extend(validate_full_run(args.verbose, &config, &bank, args.seed));

        // 5. Timer auto-fail
        results.extend(validate_timeouts(args.verbose, &config, &bank, args.seed));
    }

    // 6. Final gate
    results.extend(validate_gate(args.verbose));

    // 7. Progress persistence
    results.extend(validate_persistence(args.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Bundled data ─────────────────────────────────────────────────────

fn validate_bundled_data(
    verbose: bool,
    results: &mut Vec<TestResult>,
) -> Option<(GameConfig, Vec<QuizQuestion>)> {
    println!("--- Bundled Data ---");

    let config = match bundled_config() {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult::new("config_parse", false, e.to_string()));
            return None;
        }
    };
    results.push(TestResult::new("config_parse", true, "game_config.json valid"));

    let bank = match bundled_question_bank() {
        Ok(b) => b,
        Err(e) => {
            results.push(TestResult::new("bank_parse", false, e.to_string()));
            return None;
        }
    };
    results.push(TestResult::new(
        "bank_parse",
        true,
        format!("{} questions", bank.len()),
    ));

    results.push(TestResult::new(
        "bank_covers_session",
        bank.len() > config.quiz.session_size,
        format!(
            "bank {} vs session {} (retries need spare questions)",
            bank.len(),
            config.quiz.session_size
        ),
    ));

    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
    for q in &bank {
        *categories.entry(q.category.as_str()).or_default() += 1;
    }
    if verbose {
        for (category, count) in &categories {
            println!("  {:<12} {}", category, count);
        }
    }
    results.push(TestResult::new(
        "bank_categories",
        categories.len() >= 3,
        format!("{} categories", categories.len()),
    ));

    let answers: HashSet<usize> = bank.iter().map(|q| q.correct_index).collect();
    results.push(TestResult::new(
        "bank_answer_spread",
        answers.len() >= 3,
        format!("correct answers use {} of 4 positions", answers.len()),
    ));

    Some((config, bank))
}

// ── 2. Quiz draws ───────────────────────────────────────────────────────

fn validate_quiz_draws(verbose: bool, bank: &[QuizQuestion], seed: u64) -> Vec<TestResult> {
    println!("--- Quiz Draws ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let size = 10.min(bank.len());
    let runs = 2000;

    let mut seen = vec![0usize; bank.len()];
    let mut orderings = HashSet::new();
    let mut bad_draws = 0;

    for _ in 0..runs {
        match draw_indices(bank.len(), size, &mut rng) {
            Ok(draw) => {
                let unique: HashSet<_> = draw.iter().collect();
                if unique.len() != size || draw.iter().any(|i| *i >= bank.len()) {
                    bad_draws += 1;
                }
                for i in &draw {
                    seen[*i] += 1;
                }
                orderings.insert(draw);
            }
            Err(_) => bad_draws += 1,
        }
    }

    results.push(TestResult::new(
        "draw_distinct_in_range",
        bad_draws == 0,
        format!("{} bad draws in {}", bad_draws, runs),
    ));

    let expected = (runs * size) as f64 / bank.len() as f64;
    let worst = seen
        .iter()
        .map(|c| (*c as f64 - expected).abs() / expected)
        .fold(0.0, f64::max);
    if verbose {
        println!("  expected {:.0} per question, worst deviation {:.1}%", expected, worst * 100.0);
    }
    results.push(TestResult::new(
        "draw_uniform",
        worst < 0.15,
        format!("worst deviation {:.1}%", worst * 100.0),
    ));

    results.push(TestResult::new(
        "draw_orderings_vary",
        orderings.len() > runs * 9 / 10,
        format!("{} distinct orderings", orderings.len()),
    ));

    let too_large = draw_indices(bank.len(), bank.len() + 1, &mut rng).is_err();
    results.push(TestResult::new(
        "draw_rejects_oversize",
        too_large,
        "session larger than bank is an error",
    ));

    results
}

// ── 3. Scoring ──────────────────────────────────────────────────────────

fn validate_scoring(verbose: bool, bank: &[QuizQuestion], seed: u64) -> Vec<TestResult> {
    println!("--- Scoring ---");
    let mut results = Vec::new();
    let mut mismatches = Vec::new();

    for correct in 0..=10usize {
        let config = QuizConfig {
            session_size: 10,
            seed: Some(seed),
            ..Default::default()
        };
        let Ok(mut quiz) = QuizEngine::new(bank.to_vec(), config) else {
            results.push(TestResult::new("scoring_setup", false, "quiz rejected bank"));
            return results;
        };
        quiz.activate();
        answer_session(&mut quiz, correct);

        let mut progress = ProgressStore::in_memory();
        let Some(result) = quiz.finish_session(&mut progress) else {
            mismatches.push(format!("{} correct: no result", correct));
            continue;
        };
        let expect_pass = correct * 10 >= DEFAULT_PASS_PERCENTAGE as usize;
        if verbose {
            println!(
                "  {:>2}/10 -> {:>5.1}% {}",
                correct,
                result.score_percentage,
                if result.passed { "PASS" } else { "fail" }
            );
        }
        if result.passed != expect_pass || quiz.is_completed() != expect_pass {
            mismatches.push(format!("{} correct", correct));
        }
    }

    results.push(TestResult::new(
        "scoring_threshold",
        mismatches.is_empty(),
        if mismatches.is_empty() {
            "pass from 7/10 (70%) upward".to_string()
        } else {
            format!("wrong verdict for {}", mismatches.join(", "))
        },
    ));
    results
}

fn answer_session(quiz: &mut QuizEngine, correct: usize) {
    let total = quiz.session().map(|s| s.len()).unwrap_or(0);
    for i in 0..total {
        let Some(right) = quiz
            .session()
            .and_then(|s| s.current_question())
            .map(|q| q.correct_index)
        else {
            return;
        };
        let pick = if i < correct { right } else { (right + 1) % 4 };
        quiz.answer(pick);
    }
}

// ── 4. Full run ─────────────────────────────────────────────────────────

fn seeded_engine(config: &GameConfig, bank: &[QuizQuestion], seed: u64) -> Option<GameEngine> {
    let mut config = config.clone();
    config.quiz.seed = Some(seed);
    match GameEngine::new(
        config,
        bank.to_vec(),
        ProgressStore::in_memory(),
        Box::new(SilentFeedback),
    ) {
        Ok(engine) => Some(engine),
        Err(e) => {
            log::error!("Engine setup failed: {}", e);
            None
        }
    }
}

/// Drive levels 1-3 with scripted solutions. Returns the level that got
/// stuck, if any.
fn play_levels_1_to_3(engine: &mut GameEngine) -> Result<(), u8> {
    engine.skip_opening();
    engine.start_level(1).map_err(|_| 1u8)?;

    let cable = engine.puzzle_mut::<CableWiringPuzzle>().ok_or(1u8)?;
    cable.connect("battery+", "switch");
    cable.connect("switch", "bulb");
    cable.connect("bulb", "battery-");
    cable.toggle_switch();
    engine.update(1.0 / 60.0);
    if engine.current_state() != GameState::Level2 {
        return Err(1);
    }

    let tv = engine.puzzle_mut::<TvSequencePuzzle>().ok_or(2u8)?;
    tv.plug_in();
    tv.press_power();
    for _ in 0..90 {
        engine.update(1.0 / 60.0);
    }
    let tv = engine.puzzle_mut::<TvSequencePuzzle>().ok_or(2u8)?;
    // Scan the dial by signal strength, like a player would
    for _ in 0..64 {
        if tv.signal_strength() >= 1.0 {
            break;
        }
        tv.channel_up();
    }
    for _ in 0..180 {
        engine.update(1.0 / 60.0);
        if engine.current_state() != GameState::Level2 {
            break;
        }
    }
    if engine.current_state() != GameState::Level3 {
        return Err(2);
    }

    let kitchen = engine.puzzle_mut::<KitchenEfficiencyPuzzle>().ok_or(3u8)?;
    for name in ["fridge", "oven", "lights"] {
        kitchen.upgrade(name);
        kitchen.toggle(name);
    }
    let bill = engine.puzzle_mut::<BillSimulatorPuzzle>().ok_or(3u8)?;
    let by_cost: Vec<String> = bill
        .cost_breakdown()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    for name in by_cost {
        if bill.monthly_bill() <= bill.target_bill() {
            break;
        }
        bill.set_hours(&name, 0.0);
    }
    bill.submit();
    engine.update(1.0 / 60.0);
    if engine.current_state() != GameState::Level4 {
        return Err(3);
    }
    Ok(())
}

fn validate_full_run(
    verbose: bool,
    config: &GameConfig,
    bank: &[QuizQuestion],
    seed: u64,
) -> Vec<TestResult> {
    println!("--- Full Run ---");
    let mut results = Vec::new();
    let Some(mut engine) = seeded_engine(config, bank, seed) else {
        results.push(TestResult::new("full_run_setup", false, "engine setup failed"));
        return results;
    };

    match play_levels_1_to_3(&mut engine) {
        Ok(()) => results.push(TestResult::new(
            "levels_1_to_3",
            true,
            format!("{} keys after level 3", engine.progress().keys_collected()),
        )),
        Err(level) => {
            results.push(TestResult::new(
                "levels_1_to_3",
                false,
                format!("stuck in level {} ({:?})", level, engine.current_state()),
            ));
            return results;
        }
    }

    // Fail once, then retry and pass
    if let Some(quiz) = engine.puzzle_mut::<QuizEngine>() {
        answer_session(quiz, 3);
    }
    engine.update(1.0 / 60.0);
    let failed_first = engine.current_state() == GameState::Level4
        && engine
            .find_puzzle::<QuizEngine>()
            .and_then(|q| q.result())
            .is_some_and(|r| !r.passed);
    results.push(TestResult::new(
        "quiz_fail_stays_in_level",
        failed_first,
        "3/10 keeps the player on level 4",
    ));

    if let Some(quiz) = engine.puzzle_mut::<QuizEngine>() {
        if let Err(e) = quiz.retry() {
            log::error!("Quiz retry failed: {}", e);
        }
        answer_session(quiz, 10);
    }
    engine.update(1.0 / 60.0);

    if verbose {
        if let Some(session) = engine.find_puzzle::<QuizEngine>().and_then(|q| q.session()) {
            for (category, (correct, asked)) in session.category_breakdown() {
                println!("  {:<12} {}/{}", category, correct, asked);
            }
        }
    }

    let progress = engine.progress();
    results.push(TestResult::new(
        "reaches_ending",
        engine.current_state() == GameState::EndingScene,
        format!("{:?}", engine.current_state()),
    ));
    results.push(TestResult::new(
        "all_keys_collected",
        progress.all_keys_collected(),
        format!("{}/{} keys", progress.keys_collected(), KEY_COUNT),
    ));
    results.push(TestResult::new(
        "game_completed",
        progress.game_completed(),
        format!("current level {}", progress.current_level()),
    ));

    for _ in 0..(60 * 30) {
        engine.update(1.0 / 60.0);
        if engine.current_state() == GameState::MainMenu {
            break;
        }
    }
    results.push(TestResult::new(
        "ending_returns_to_menu",
        engine.current_state() == GameState::MainMenu,
        format!("after {:.1}s of play", engine.play_time()),
    ));

    results
}

// ── 5. Timeouts ─────────────────────────────────────────────────────────

fn validate_timeouts(
    _verbose: bool,
    config: &GameConfig,
    bank: &[QuizQuestion],
    seed: u64,
) -> Vec<TestResult> {
    println!("--- Quiz Timeouts ---");
    let mut results = Vec::new();
    let Some(mut engine) = seeded_engine(config, bank, seed.wrapping_add(1)) else {
        results.push(TestResult::new("timeout_setup", false, "engine setup failed"));
        return results;
    };
    if play_levels_1_to_3(&mut engine).is_err() {
        results.push(TestResult::new("timeout_setup", false, "could not reach level 4"));
        return results;
    }

    let per_question = config.quiz.seconds_per_question;
    engine.update(per_question);
    let advanced_once = engine
        .find_puzzle::<QuizEngine>()
        .and_then(|q| q.session())
        .is_some_and(|s| s.current_index() == 1 && s.correct_count() == 0);
    results.push(TestResult::new(
        "timeout_advances_once",
        advanced_once,
        "one expired deadline skips exactly one question",
    ));

    engine.set_time_scale(4.0);
    for _ in 0..(config.quiz.session_size * 10) {
        engine.update(per_question / 4.0);
    }
    let result = engine.find_puzzle::<QuizEngine>().and_then(|q| q.result());
    results.push(TestResult::new(
        "timeouts_fail_session",
        result.is_some_and(|r| !r.passed && r.correct == 0),
        format!("{:?}", result.map(|r| r.score_percentage)),
    ));
    results
}

// ── 6. Gate ─────────────────────────────────────────────────────────────

fn validate_gate(_verbose: bool) -> Vec<TestResult> {
    println!("--- Final Gate ---");
    let mut results = Vec::new();
    let Some(spec) = LevelSpec::standard(4, 3) else {
        results.push(TestResult::new("gate_setup", false, "no level 4 layout"));
        return results;
    };
    let mut level = LevelOrchestrator::new(spec, Vec::new());
    let mut progress = ProgressStore::in_memory();

    for held in 0..KEY_COUNT {
        let outcome = level.activate(&progress);
        let expect_open = held >= 3;
        let ok = match outcome {
            Ok(()) => expect_open,
            Err(GateError::MissingKeys { collected, required }) => {
                !expect_open && collected == held && required == 3
            }
        };
        results.push(TestResult::new(
            &format!("gate_with_{}_keys", held),
            ok,
            if expect_open { "opens" } else { "stays closed" },
        ));
        level.deactivate();
        progress.collect_key(held);
    }
    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();
    let backend = MemoryBackend::new();

    {
        let mut store = ProgressStore::open(Box::new(backend.clone()));
        store.collect_key(0);
        store.collect_key(0);
        store.collect_key(7);
        store.complete_level(1);
        store.complete_level(1);
        store.set_volume(VolumeChannel::Music, 0.3);
    }

    let reopened = ProgressStore::open(Box::new(backend.clone()));
    results.push(TestResult::new(
        "progress_reloads",
        reopened.current_level() == 2
            && reopened.keys_collected() == 1
            && (reopened.volumes().music - 0.3).abs() < 1e-6,
        format!(
            "level {}, {} key(s), music {:.2}",
            reopened.current_level(),
            reopened.keys_collected(),
            reopened.volumes().music
        ),
    ));
    results.push(TestResult::new(
        "ignored_calls_not_saved",
        backend.save_count() == 3,
        format!("{} saves for 3 real changes", backend.save_count()),
    ));
    results.push(TestResult::new(
        "stored_keys",
        backend
            .stored_json()
            .is_some_and(|json| json.contains("\"EnergyKey_0\": true")),
        "flat key-value record",
    ));
    results
}
