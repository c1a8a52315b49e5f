//! Erros do núcleo CPM

use thiserror::Error;

/// Tipo de resultado das operações de matriz
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Tipo de resultado do engine
pub type EngineResult<T> = Result<T, EngineError>;

/// Erros de álgebra de matrizes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Dimensões internas incompatíveis na multiplicação
    #[error("First {left} matrix doesn't match second {right} matrix by sizes in multiplication")]
    DimensionMismatch { left: String, right: String },

    /// Potência de matriz não quadrada
    #[error("Can't construct power of non-square {0} matrix")]
    NotSquare(String),

    /// Linhas com comprimentos diferentes
    #[error("Ragged matrix rows: row {row} has {found} elements, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Erros internos do engine de matrix code.
///
/// Nunca deveriam ocorrer para um programa produzido pelo recompilador;
/// indicam um bug do compilador.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Instrução com operando do tipo errado
    #[error("Invalid matrix code instruction: {0}")]
    InvalidInstruction(String),

    /// Bloco LOOP sem END
    #[error("LOOP block at instruction {0} is never terminated by END")]
    UnterminatedLoop(usize),

    /// END fora de qualquer bloco LOOP
    #[error("Unexpected END at instruction {0} outside of any LOOP block")]
    UnexpectedEnd(usize),

    /// Índice de variável fora do vetor de estado
    #[error("Variable slot {slot} is out of range for a state vector of {size} slots")]
    SlotOutOfRange { slot: usize, size: usize },

    /// Erro de matriz propagado
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// Erros de avaliação de valores escalares
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("integer division or modulo by zero")]
    DivisionByZero,

    #[error("negative exponent {0} in integer power")]
    NegativeExponent(String),

    #[error("exponent {0} is too large")]
    ExponentTooLarge(String),

    #[error("negative shift count {0}")]
    NegativeShift(String),

    #[error("shift count {0} is too large")]
    ShiftTooLarge(String),

    /// Operação inteira aplicada a um float
    #[error("operator '{op}' is not supported for {kind} operands")]
    Unsupported { op: &'static str, kind: &'static str },

    #[error("value {0} is not an integer")]
    NotAnInteger(String),
}
