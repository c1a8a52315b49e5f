//! Error types for the loop recompiler

use std::fmt;

use cpm_core::ValueKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Why a loop body cannot be turned into matrix code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("Unsupported instruction {0}")]
    UnsupportedInstruction(String),

    /// A non-affine operation reached a value that lives in the matrix
    #[error("All operands of instruction {0} must be a constant or must have a predictable value")]
    UnpredictableOperands(String),

    #[error("Multiplication of two unpredictable values is unsupported")]
    UnpredictableMultiplication,

    #[error("Constant {value} has an unallowed type {kind} instead of one of allowed types: {allowed}")]
    DisallowedConstant {
        value: String,
        kind: ValueKind,
        allowed: String,
    },

    #[error("Unsupported iterator usage in instruction {0}")]
    UnsupportedIterator(String),

    #[error("Unsupported loop type or invalid stack usage in bytecode")]
    InvalidStack,
}

/// A compilation failure, located at the offending instruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// Offending instruction, rendered
    pub instruction: Option<String>,
    /// Most recent source line marker
    pub line: Option<u32>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, instruction: Option<String>, line: Option<u32>) -> Self {
        Self {
            kind,
            instruction,
            line,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Can't optimize loop: {}", self.kind)?;
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }
        if let Some(instruction) = &self.instruction {
            write!(f, " (in `{}`)", instruction)?;
        }
        Ok(())
    }
}
