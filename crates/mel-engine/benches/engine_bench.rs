use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mel_engine::{compose_phrase, GuessEvaluator, Looper, ScriptedTracks};
use mel_ir::LooperConfig;

fn bench_process_block(c: &mut Criterion) {
    let (mut looper, _input) = Looper::new(LooperConfig::default()).unwrap();
    let mut out = vec![0.0f32; 512 * 2];
    c.bench_function("process_block 512 stereo", |b| {
        b.iter(|| black_box(looper.process_block(&mut out, 2)))
    });
}

fn bench_compose(c: &mut Criterion) {
    c.bench_function("compose tracks 240000", |b| {
        b.iter(|| ScriptedTracks::compose(black_box(240_000)))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let phrase = compose_phrase(240_000);
    let guess = phrase.clone();
    let evaluator = GuessEvaluator::default();
    c.bench_function("evaluate perfect guess", |b| {
        b.iter(|| evaluator.evaluate(black_box(&phrase), black_box(&guess)))
    });
}

criterion_group!(benches, bench_process_block, bench_compose, bench_evaluate);
criterion_main!(benches);
