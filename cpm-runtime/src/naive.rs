//! Literal loop interpreter
//!
//! Runs the unmodified body once per element with a real value stack. This
//! is the fallback path and the reference the accelerated path must match.

use cpm_compiler::{Arg, Instruction, Opcode};
use cpm_core::Value;

use crate::error::{RuntimeError, RuntimeResult};
use crate::frame::Frame;
use crate::progression::Iterable;

struct Machine<'a> {
    frame: &'a mut Frame,
    stack: Vec<Value>,
}

impl Machine<'_> {
    fn pop(&mut self, instr: &Instruction) -> RuntimeResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::Naive(format!("stack underflow in {}", instr)))
    }

    fn require(&self, count: usize, instr: &Instruction) -> RuntimeResult<usize> {
        self.stack
            .len()
            .checked_sub(count)
            .ok_or_else(|| RuntimeError::Naive(format!("stack underflow in {}", instr)))
    }

    fn step(&mut self, instr: &Instruction) -> RuntimeResult<()> {
        use Opcode::*;

        if let Some(op) = instr.opcode.unary_op() {
            let value = self.pop(instr)?;
            self.stack.push(value.unary(op)?);
            return Ok(());
        }
        if let Some(op) = instr.opcode.binary_op() {
            let rhs = self.pop(instr)?;
            let lhs = self.pop(instr)?;
            self.stack.push(lhs.binary(op, &rhs)?);
            return Ok(());
        }
        if let Some((var, is_store)) = instr.var_ref() {
            if is_store {
                let value = self.pop(instr)?;
                self.frame.store(&var, value);
            } else {
                let value = self
                    .frame
                    .load(&var)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable(var.name.clone()))?;
                self.stack.push(value);
            }
            return Ok(());
        }

        match (instr.opcode, &instr.arg) {
            (Nop | SetLineno, _) => {}
            (PopTop, _) => {
                self.pop(instr)?;
            }
            (RotTwo, _) => self.rotate(2, instr)?,
            (RotThree, _) => self.rotate(3, instr)?,
            (RotFour, _) => self.rotate(4, instr)?,
            (DupTop, _) => self.duplicate(1, instr)?,
            (DupTopX, Arg::Count(count)) => self.duplicate(*count, instr)?,
            (LoadConst, Arg::Const(value)) => self.stack.push(value.clone()),
            _ => return Err(RuntimeError::Naive(instr.to_string())),
        }
        Ok(())
    }

    fn rotate(&mut self, count: usize, instr: &Instruction) -> RuntimeResult<()> {
        let start = self.require(count, instr)?;
        self.stack[start..].rotate_right(1);
        Ok(())
    }

    fn duplicate(&mut self, count: usize, instr: &Instruction) -> RuntimeResult<()> {
        let start = self.require(count, instr)?;
        self.stack.extend_from_within(start..);
        Ok(())
    }
}

/// Iterates literally, storing each element through the body's first
/// instruction
pub fn run(body: &[Instruction], iterable: &Iterable, frame: &mut Frame) -> RuntimeResult<()> {
    let mut machine = Machine {
        frame,
        stack: Vec::new(),
    };
    for element in iterable.values() {
        machine.stack.clear();
        machine.stack.push(element);
        for instr in body {
            machine.step(instr)?;
        }
    }
    Ok(())
}
