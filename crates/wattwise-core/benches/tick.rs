//! Engine tick and quiz draw benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wattwise_core::data::bundled_question_bank;
use wattwise_core::prelude::*;
use wattwise_logic::quiz::draw_indices;

fn bench_engine_tick(c: &mut Criterion) {
    let mut engine = GameEngine::bundled(ProgressStore::in_memory(), Box::new(SilentFeedback))
        .expect("bundled data is valid");
    engine.skip_opening();
    engine.start_level(1).expect("level 1 is always unlocked");

    c.bench_function("engine_tick_level1", |b| {
        b.iter(|| {
            engine.update(black_box(1.0 / 60.0));
        })
    });
}

fn bench_quiz_draw(c: &mut Criterion) {
    let bank_len = bundled_question_bank().map(|b| b.len()).unwrap_or(20);
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("quiz_draw_10", |b| {
        b.iter(|| draw_indices(black_box(bank_len), 10, &mut rng))
    });
}

criterion_group!(benches, bench_engine_tick, bench_quiz_draw);
criterion_main!(benches);
