//! Folded constants
//!
//! A folded constant is a tiny stack program whose value depends only on
//! the loop's invocation-time inputs. Programs are evaluated once, in
//! order, right before the accelerated loop runs; a program may read the
//! results of the programs before it through [`FoldOp::LoadFolded`].

use std::fmt;

use cpm_core::{BinaryOp, UnaryOp, Value};
use serde::{Deserialize, Serialize};

use crate::bytecode::VarRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FoldOp {
    Push(Value),
    /// Value of a variable the loop body never stores to
    LoadVar(VarRef),
    /// Value of an earlier folded constant
    LoadFolded(usize),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

pub type FoldProgram = Vec<FoldOp>;

/// `Some(i)` when the program only re-reads folded constant `i`
pub fn folded_ref(program: &[FoldOp]) -> Option<usize> {
    match program {
        [FoldOp::LoadFolded(index)] => Some(*index),
        _ => None,
    }
}

impl fmt::Display for FoldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldOp::Push(v) => write!(f, "push {}", v),
            FoldOp::LoadVar(var) => write!(f, "load {}", var),
            FoldOp::LoadFolded(i) => write!(f, "load const{}", i),
            FoldOp::Unary(op) => write!(f, "unary {}", op.symbol()),
            FoldOp::Binary(op) => write!(f, "binary {}", op.symbol()),
        }
    }
}
