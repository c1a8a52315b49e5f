//! # ⚡ cpm-runtime — Accelerated loop execution
//!
//! Liga o compilador (`cpm-compiler`) ao motor de matrizes (`cpm-core`)
//! no momento em que o loop é executado.
//!
//! ## Fluxo de Execução
//!
//! ```text
//! loop body (Instruction stream)
//!      ↓
//! Accelerator::compile (cpm-compiler) ─── falha → iteração literal
//!      ↓
//! LoopSite (imutável, compartilhável)
//!      ↓
//! Accelerator::run ←─── Executa aqui
//!      ├─ check_iterable   (progressão? iterações > limite?)
//!      ├─ load_vars        (tipos permitidos)
//!      ├─ folded constants (uma vez por execução)
//!      ├─ Engine::run      (exponenciação)
//!      └─ WriteBack        (só depois de tudo dar certo)
//! ```
//!
//! ## Exemplo
//!
//! ```
//! use cpm_compiler::{Instruction, Opcode};
//! use cpm_runtime::{Accelerator, ExecPath, Frame, Iterable, Progression, Settings};
//! use cpm_core::Value;
//!
//! // for i in range(10000): res += i
//! let body = vec![
//!     Instruction::store_fast("i"),
//!     Instruction::load_fast("res"),
//!     Instruction::load_fast("i"),
//!     Instruction::op(Opcode::InplaceAdd),
//!     Instruction::store_fast("res"),
//! ];
//! let accelerator = Accelerator::new(Settings::default()).unwrap();
//! let site = accelerator.compile(body, None).unwrap();
//!
//! let mut frame = Frame::new().with_local("res", 0);
//! let report = accelerator
//!     .run(&site, &Iterable::Range(Progression::upto(10000)), &mut frame)
//!     .unwrap();
//! assert_eq!(report.path, ExecPath::Accelerated);
//! assert_eq!(frame.local("res"), Some(&Value::from(49995000)));
//! ```

pub mod env;
pub mod error;
pub mod executor;
pub mod folded;
pub mod frame;
pub mod hook;
pub mod naive;
pub mod progression;
pub mod settings;

pub use error::{Error, Result, RuntimeError, RuntimeResult};
pub use executor::{LoopShape, WriteBack, exec_loop, execute};
pub use frame::Frame;
pub use hook::{Accelerator, ExecPath, LoopSite, RunReport};
pub use progression::{Iterable, Progression};
pub use settings::Settings;
