//! Shared helpers for the runtime integration tests

#![allow(dead_code)]

use cpm_compiler::{Instruction, Opcode, VarRef};
use cpm_core::Value;
use cpm_runtime::{Accelerator, ExecPath, Frame, Iterable, Progression, Settings};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Settings that accelerate anything longer than two iterations
pub fn eager(fold_constant_rows: bool, clear_freed_stack_slots: bool) -> Settings {
    Settings {
        strict: true,
        iters_limit: 2,
        fold_constant_rows,
        clear_freed_stack_slots,
        ..Settings::default()
    }
}

/// Loop body builder: `Body::target("i").load("x").load("i").op(..).store("x")`
#[derive(Debug, Clone, Default)]
pub struct Body(Vec<Instruction>);

impl Body {
    pub fn target(name: &str) -> Self {
        Self(vec![Instruction::store_fast(name)])
    }

    pub fn load(mut self, name: &str) -> Self {
        self.0.push(Instruction::load_fast(name));
        self
    }

    pub fn store(mut self, name: &str) -> Self {
        self.0.push(Instruction::store_fast(name));
        self
    }

    pub fn load_var(mut self, var: &VarRef) -> Self {
        self.0.push(Instruction::load(var));
        self
    }

    pub fn store_var(mut self, var: &VarRef) -> Self {
        self.0.push(Instruction::store(var));
        self
    }

    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.0.push(Instruction::load_const(value));
        self
    }

    pub fn op(mut self, opcode: Opcode) -> Self {
        self.0.push(Instruction::op(opcode));
        self
    }

    pub fn dup_topx(mut self, count: usize) -> Self {
        self.0.push(Instruction::dup_topx(count));
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.0.push(Instruction::set_lineno(line));
        self
    }

    pub fn build(self) -> Vec<Instruction> {
        self.0
    }
}

/// Runs `body` accelerated and literally from the same frame and checks
/// both end in the same state
pub fn assert_equivalent(body: Vec<Instruction>, iterable: Iterable, frame: Frame, settings: Settings) -> Frame {
    let accelerator = Accelerator::new(settings).unwrap();
    let site = accelerator.compile(body.clone(), Some(1)).unwrap();

    let mut accelerated = frame.clone();
    let report = accelerator.run(&site, &iterable, &mut accelerated).unwrap();
    assert_eq!(report.path, ExecPath::Accelerated);
    assert_eq!(report.iterations, iterable.len());

    let mut literal = frame;
    cpm_runtime::naive::run(&body, &iterable, &mut literal).unwrap();
    assert_eq!(accelerated, literal);
    accelerated
}

pub fn range(start: i64, stop: i64, step: i64) -> Iterable {
    Iterable::Range(Progression::new(start, stop, step).unwrap())
}
