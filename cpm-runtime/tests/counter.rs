//! Loop target handling across the three counter classes

mod common;

use common::{Body, assert_equivalent, eager, range};
use cpm_compiler::{CounterStatus, Opcode};
use cpm_core::Value;
use cpm_runtime::{Accelerator, ExecPath, Frame, Settings};

fn status_of(body: Vec<cpm_compiler::Instruction>, settings: Settings) -> CounterStatus {
    let accelerator = Accelerator::new(settings).unwrap();
    let site = accelerator.compile(body, None).unwrap();
    site.compiled().unwrap().counter_status
}

/// x += 1, target unused
fn unused() -> Vec<cpm_compiler::Instruction> {
    Body::target("i")
        .load("x")
        .constant(1)
        .op(Opcode::InplaceAdd)
        .store("x")
        .build()
}

/// x += i
fn read_only() -> Vec<cpm_compiler::Instruction> {
    Body::target("i")
        .load("x")
        .load("i")
        .op(Opcode::InplaceAdd)
        .store("x")
        .build()
}

/// i = i * 2; x += i
fn mutated() -> Vec<cpm_compiler::Instruction> {
    Body::target("i")
        .load("i")
        .constant(2)
        .op(Opcode::BinaryMultiply)
        .store("i")
        .load("x")
        .load("i")
        .op(Opcode::InplaceAdd)
        .store("x")
        .build()
}

/// x += i; i = i + 5; x += i; i = i * 3
fn read_around_stores() -> Vec<cpm_compiler::Instruction> {
    Body::target("i")
        .load("x")
        .load("i")
        .op(Opcode::InplaceAdd)
        .store("x")
        .load("i")
        .constant(5)
        .op(Opcode::BinaryAdd)
        .store("i")
        .load("x")
        .load("i")
        .op(Opcode::InplaceAdd)
        .store("x")
        .load("i")
        .constant(3)
        .op(Opcode::BinaryMultiply)
        .store("i")
        .build()
}

#[test]
fn test_classification() {
    assert_eq!(status_of(unused(), eager(true, true)), CounterStatus::Unused);
    assert_eq!(status_of(read_only(), eager(true, true)), CounterStatus::ReadOnly);
    assert_eq!(status_of(mutated(), eager(true, true)), CounterStatus::Mutated);

    // Without row folding every target goes through the service slot
    assert_eq!(status_of(unused(), eager(false, true)), CounterStatus::Mutated);
    assert_eq!(status_of(read_only(), eager(false, true)), CounterStatus::Mutated);
}

#[test]
fn test_target_ends_on_last_value() {
    for body in [unused(), read_only()] {
        for fold in [true, false] {
            let result = assert_equivalent(body.clone(), range(7, 100, 9), Frame::new().with_local("x", 0), eager(fold, true));
            assert_eq!(result.local("i"), Some(&Value::from(97)));
        }
    }
}

#[test]
fn test_target_keeps_body_mutation() {
    for fold in [true, false] {
        let result = assert_equivalent(mutated(), range(0, 50, 1), Frame::new().with_local("x", 0), eager(fold, true));
        assert_eq!(result.local("i"), Some(&Value::from(98)));
        assert_eq!(result.local("x"), Some(&Value::from(2 * (0..50).sum::<i64>())));
    }
}

#[test]
fn test_reads_around_target_stores() {
    let cases = [(range(3, 40, 3), 132, 611), (range(40, -7, -4), 3, 492)];
    for (iterable, last, sum) in cases {
        for fold in [true, false] {
            for clear in [true, false] {
                let result = assert_equivalent(
                    read_around_stores(),
                    iterable.clone(),
                    Frame::new().with_local("x", 0),
                    eager(fold, clear),
                );
                assert_eq!(result.local("i"), Some(&Value::from(last)));
                assert_eq!(result.local("x"), Some(&Value::from(sum)));
            }
        }
    }
}

#[test]
fn test_negative_step_target() {
    let result = assert_equivalent(read_only(), range(100, -100, -7), Frame::new().with_local("x", 0), eager(true, true));
    assert_eq!(result.local("i"), Some(&Value::from(-96)));
}

#[test]
fn test_empty_progression_leaves_target_alone() {
    let accelerator = Accelerator::new(eager(true, true)).unwrap();
    let site = accelerator.compile(read_only(), None).unwrap();
    let mut frame = Frame::new().with_local("x", 3);
    let report = accelerator.run(&site, &range(10, 0, 1), &mut frame).unwrap();
    assert_eq!(report.path, ExecPath::Skipped);
    assert_eq!(frame, Frame::new().with_local("x", 3));
}
