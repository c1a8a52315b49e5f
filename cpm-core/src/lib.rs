//! # 🧮 CPM-Core
//!
//! Núcleo de execução para loops afins acelerados por exponenciação de matrizes.
//!
//! > *"N iterações viram log(N) multiplicações."*
//!
//! ## O Padrão CPM
//!
//! 1. Todo loop afim é uma **matriz de transição** sobre o vetor `[vars…, 1]`
//! 2. O corpo do loop é descrito em **matrix code** (`MOV ADD SUB MUL LOOP END`)
//! 3. Um bloco `LOOP n` é uma matriz elevada a `n` por quadrados sucessivos
//! 4. Variáveis independentes são **dobradas** para fora antes da potência
//!
//! ## Arquitetura
//!
//! ```text
//! matrix code (Resolved)
//!     ↓ engine
//! transition matrix  ──▶ row folding ──▶ Matrix::power ──▶ restore
//!     ↓
//! [vars…, 1] × M  ──▶ new state
//! ```
//!
//! ## Módulos
//!
//! - [`value`]: valores escalares do host e operações primitivas
//! - [`matrix`]: matriz densa de inteiros com potência binária
//! - [`matcode`]: vocabulário do matrix code e estágios de operandos
//! - [`folding`]: otimizador de dobra de linhas
//! - [`engine`]: interpretação do matrix code em matrizes de transição
//!
//! ## Quick Start
//!
//! ```
//! use cpm_core::prelude::*;
//! use num_bigint::BigInt;
//!
//! // x = x + 3, repetido 10 vezes
//! let code = vec![
//!     Instr::Loop(Resolved::Value(BigInt::from(10))),
//!     Instr::Add(Resolved::Var(0), Resolved::Value(BigInt::from(3))),
//!     Instr::End,
//! ];
//! let state = Engine::new(true).run(&code, &[BigInt::from(1)]).unwrap();
//! assert_eq!(state, vec![BigInt::from(31)]);
//! ```

pub mod engine;
pub mod error;
pub mod folding;
pub mod matcode;
pub mod matrix;
pub mod value;

pub use engine::Engine;
pub use error::{EngineError, EngineResult, MatrixError, MatrixResult, ValueError};
pub use folding::RowFolding;
pub use matcode::{Instr, MatOp, Operand, Param, Resolved};
pub use matrix::Matrix;
pub use value::{BinaryOp, TypeSet, UnaryOp, Value, ValueKind};

/// Re-exports mais usados
pub mod prelude {
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, MatrixError, ValueError};
    pub use crate::folding::RowFolding;
    pub use crate::matcode::{Instr, MatOp, Operand, Param, Resolved};
    pub use crate::matrix::Matrix;
    pub use crate::value::{BinaryOp, TypeSet, UnaryOp, Value, ValueKind};
}
