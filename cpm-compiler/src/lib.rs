//! # CPM Compiler - loop bodies to matrix code
//!
//! Turns the body of a counted loop, given as stack-machine instructions,
//! into CPM matrix code that `cpm-core` raises to the iteration count.
//!
//! ## Core Idea
//!
//! - **Symbolic execution**: the body is walked once on a symbolic stack
//! - **Constant folding**: values known before the loop become small fold
//!   programs evaluated once per run
//! - **Affine emission**: everything else becomes `MOV/ADD/SUB/MUL` on a
//!   unified variable table
//!
//! ## Example
//!
//! ```
//! use cpm_compiler::{CompileOptions, Instruction, Opcode, recompile};
//!
//! // for i in range(...): res += i
//! let body = vec![
//!     Instruction::store_fast("i"),
//!     Instruction::load_fast("res"),
//!     Instruction::load_fast("i"),
//!     Instruction::op(Opcode::InplaceAdd),
//!     Instruction::store_fast("res"),
//! ];
//! let compiled = recompile(&body, &CompileOptions::default(), None).unwrap();
//! assert!(compiled.disassemble().starts_with("MOV var0, start"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Instruction stream (loop body)
//!     ↓ counter classification
//! Unified variable table
//!     ↓ opcode handlers (symbolic stack)
//! Matrix code (Operand) + fold programs
//!     ↓ cpm-runtime
//! Execution
//! ```

pub mod bytecode;
pub mod error;
pub mod fold;
pub mod options;
pub mod recompiler;

pub use bytecode::{Arg, Instruction, Opcode, VarRef, VarScope};
pub use error::{CompileError, CompileErrorKind, Result};
pub use fold::{FoldOp, FoldProgram};
pub use options::CompileOptions;
pub use recompiler::{CompiledLoop, CounterStatus, Slot, SlotKey, recompile};
