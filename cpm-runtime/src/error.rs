//! Error types for the CPM runtime

use cpm_compiler::CompileError;
use cpm_core::{EngineError, ValueError, ValueKind};
use thiserror::Error;

/// Failure of one accelerated invocation. The host falls back to literal
/// iteration unless it runs in strict mode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Iterator has type {0} instead of a bounded integer progression")]
    NotAProgression(String),

    #[error("Progression step must not be zero")]
    ZeroStep,

    #[error("Variable \"{name}\" has unallowed type {kind} instead of one of allowed types: {allowed}")]
    DisallowedType {
        name: String,
        kind: ValueKind,
        allowed: String,
    },

    #[error("Name '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ValueError),

    #[error("Malformed folded constant #{0}")]
    InvalidFoldProgram(usize),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Can't execute instruction literally: {0}")]
    Naive(String),
}

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced to the host
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Can't run optimized loop: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
