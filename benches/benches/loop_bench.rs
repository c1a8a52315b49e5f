//! # Loop Benchmarks
//!
//! Accelerated vs literal execution of the same loop bodies.
//!
//! Run: `cargo bench --bench loop_bench`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cpm_compiler::{Instruction, Opcode};
use cpm_runtime::{Accelerator, Frame, Iterable, Progression, Settings, naive};

/// res += i
fn sum_body() -> Vec<Instruction> {
    vec![
        Instruction::store_fast("i"),
        Instruction::load_fast("res"),
        Instruction::load_fast("i"),
        Instruction::op(Opcode::InplaceAdd),
        Instruction::store_fast("res"),
    ]
}

/// a, b = b, a + b
fn fib_body() -> Vec<Instruction> {
    vec![
        Instruction::store_fast("_"),
        Instruction::load_fast("b"),
        Instruction::load_fast("a"),
        Instruction::load_fast("b"),
        Instruction::op(Opcode::BinaryAdd),
        Instruction::op(Opcode::RotTwo),
        Instruction::store_fast("a"),
        Instruction::store_fast("b"),
    ]
}

fn eager() -> Settings {
    Settings {
        iters_limit: 2,
        ..Settings::default()
    }
}

/// Benchmark both paths over growing iteration counts
fn bench_paths(c: &mut Criterion, name: &str, body: Vec<Instruction>, frame: Frame) {
    let mut group = c.benchmark_group(name);
    let accelerator = Accelerator::new(eager()).unwrap();
    let site = accelerator.compile(body.clone(), None).unwrap();

    for count in [100u64, 1_000, 10_000] {
        let iterable = Iterable::Range(Progression::upto(count));

        group.bench_with_input(BenchmarkId::new("accelerated", count), &iterable, |b, iterable| {
            b.iter(|| {
                let mut frame = frame.clone();
                accelerator.run(&site, iterable, &mut frame).unwrap();
                black_box(frame)
            })
        });

        group.bench_with_input(BenchmarkId::new("literal", count), &iterable, |b, iterable| {
            b.iter(|| {
                let mut frame = frame.clone();
                naive::run(&body, iterable, &mut frame).unwrap();
                black_box(frame)
            })
        });
    }

    group.finish();
}

fn bench_sum(c: &mut Criterion) {
    bench_paths(c, "arith_sum", sum_body(), Frame::new().with_local("res", 0));
}

fn bench_fib(c: &mut Criterion) {
    bench_paths(c, "fibonacci", fib_body(), Frame::new().with_local("a", 0).with_local("b", 1));
}

/// Only the accelerated path can reach these counts
fn bench_huge(c: &mut Criterion) {
    let mut group = c.benchmark_group("huge_counts");
    let accelerator = Accelerator::new(eager()).unwrap();
    let site = accelerator.compile(sum_body(), None).unwrap();

    for exp in [6u32, 12, 18] {
        let iterable = Iterable::Range(Progression::upto(10u64.pow(exp)));
        group.bench_with_input(BenchmarkId::new("arith_sum", format!("1e{exp}")), &iterable, |b, iterable| {
            b.iter(|| {
                let mut frame = Frame::new().with_local("res", 0);
                accelerator.run(&site, iterable, &mut frame).unwrap();
                black_box(frame)
            })
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let accelerator = Accelerator::new(Settings::default()).unwrap();
    c.bench_function("compile_fib_body", |b| {
        b.iter(|| black_box(accelerator.compile(black_box(fib_body()), None).unwrap()))
    });
}

criterion_group!(benches, bench_sum, bench_fib, bench_huge, bench_compile);
criterion_main!(benches);
