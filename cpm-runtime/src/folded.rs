//! Folded-constant evaluation
//!
//! Runs once per accelerated invocation, before the matrices are built.

use cpm_compiler::{FoldOp, FoldProgram};
use cpm_core::{TypeSet, Value};
use tracing::trace;

use crate::error::{RuntimeError, RuntimeResult};
use crate::frame::Frame;

/// Evaluates constant `index`, which may read constants before it
pub fn evaluate(index: usize, program: &[FoldOp], frame: &Frame, folded: &[Value]) -> RuntimeResult<Value> {
    let mut stack: Vec<Value> = Vec::with_capacity(program.len());
    let malformed = || RuntimeError::InvalidFoldProgram(index);

    for op in program {
        let value = match op {
            FoldOp::Push(value) => value.clone(),
            FoldOp::LoadVar(var) => frame
                .load(var)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(var.name.clone()))?,
            FoldOp::LoadFolded(i) if *i < index => folded[*i].clone(),
            FoldOp::LoadFolded(_) => return Err(malformed()),
            FoldOp::Unary(op) => stack.pop().ok_or_else(malformed)?.unary(*op)?,
            FoldOp::Binary(op) => {
                let rhs = stack.pop().ok_or_else(malformed)?;
                let lhs = stack.pop().ok_or_else(malformed)?;
                lhs.binary(*op, &rhs)?
            }
        };
        stack.push(value);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(malformed()),
    }
}

/// Evaluates all constants in order and checks their types
pub fn evaluate_all(consts: &[FoldProgram], frame: &Frame, types: &TypeSet) -> RuntimeResult<Vec<Value>> {
    let mut folded = Vec::with_capacity(consts.len());
    for (index, program) in consts.iter().enumerate() {
        let value = evaluate(index, program, frame, &folded)?;
        if !types.allows(&value) {
            let name = match program.as_slice() {
                [FoldOp::LoadVar(var)] => var.name.clone(),
                _ => format!("const{}", index),
            };
            return Err(RuntimeError::DisallowedType {
                name,
                kind: value.kind(),
                allowed: types.to_string(),
            });
        }
        trace!(index, value = %value, "folded constant");
        folded.push(value);
    }
    Ok(folded)
}
