//! Compile-time options

use cpm_core::TypeSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Scalar kinds accepted in LOAD_CONST
    pub types: TypeSet,

    /// Classify counter usage and fold independent rows before exponentiation
    pub fold_constant_rows: bool,

    /// Zero stack-backed slots once they are no longer live
    pub clear_freed_stack_slots: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            types: TypeSet::default(),
            fold_constant_rows: true,
            clear_freed_stack_slots: true,
        }
    }
}

impl CompileOptions {
    pub fn with_flags(fold_constant_rows: bool, clear_freed_stack_slots: bool) -> Self {
        Self {
            fold_constant_rows,
            clear_freed_stack_slots,
            ..Self::default()
        }
    }
}
