//! # Engine Benchmarks
//!
//! Matrix power with and without row folding.
//!
//! Run: `cargo bench --bench engine_bench`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cpm_core::{Engine, Instr, Resolved};
use num_bigint::BigInt;

fn value(v: i64) -> Resolved {
    Resolved::Value(BigInt::from(v))
}

/// One live accumulator next to `width` variables that never change
fn program(width: usize, count: u64) -> Vec<Instr<Resolved>> {
    let mut code = vec![Instr::Loop(value(count as i64))];
    code.push(Instr::Mul(Resolved::Var(0), value(3)));
    for var in 1..=width {
        code.push(Instr::Add(Resolved::Var(0), Resolved::Var(var)));
    }
    code.push(Instr::End);
    code
}

fn bench_row_folding(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_folding");

    for width in [2usize, 8, 32] {
        let code = program(width, 100_000);
        let state: Vec<BigInt> = (0..=width as i64).map(BigInt::from).collect();

        group.bench_with_input(BenchmarkId::new("folded", width), &code, |b, code| {
            let engine = Engine::new(true);
            b.iter(|| black_box(engine.run(code, &state).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("plain", width), &code, |b, code| {
            let engine = Engine::new(false);
            b.iter(|| black_box(engine.run(code, &state).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_row_folding);
criterion_main!(benches);
