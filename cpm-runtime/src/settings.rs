//! Accelerator settings (cpm.toml)
//!
//! ```toml
//! strict = false
//! iters_limit = 5000
//! types = ["int", "bool"]
//! fold_constant_rows = true
//! clear_freed_stack_slots = true
//! ```

use std::path::Path;

use cpm_compiler::CompileOptions;
use cpm_core::{TypeSet, ValueKind};
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Error, Result};

pub const DEFAULT_ITERS_LIMIT: u64 = 5000;
pub const MIN_ITERS_LIMIT: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Surface compile and run-time errors instead of falling back
    pub strict: bool,

    /// Loops of at most this many iterations run literally
    pub iters_limit: u64,

    /// Scalar kinds accepted in constants and variables
    pub types: TypeSet,

    /// Row-Folding Optimizer and counter classification
    pub fold_constant_rows: bool,

    /// Zero stack-backed slots once they are no longer live
    pub clear_freed_stack_slots: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict: false,
            iters_limit: DEFAULT_ITERS_LIMIT,
            types: TypeSet::default(),
            fold_constant_rows: true,
            clear_freed_stack_slots: true,
        }
    }
}

impl Settings {
    /// Parse settings from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Settings>(content)
            .map_err(|e| Error::Config(format!("Failed to parse cpm.toml: {}", e)))?
            .validate()
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides().validate()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(strict) = env::strict() {
            self.strict = strict;
        }
        if let Some(limit) = env::iters_limit() {
            self.iters_limit = limit;
        }
        if let Some(fold) = env::fold_constant_rows() {
            self.fold_constant_rows = fold;
        }
        if let Some(clear) = env::clear_freed_stack_slots() {
            self.clear_freed_stack_slots = clear;
        }
        self
    }

    /// Clamps the iteration limit and rejects type sets the matrix can't hold
    pub fn validate(mut self) -> Result<Self> {
        self.iters_limit = self.iters_limit.max(MIN_ITERS_LIMIT);
        if self.types.contains(ValueKind::Float) {
            return Err(Error::Config(
                "float values can't be accelerated and must not be allowed".to_string(),
            ));
        }
        if self.types.iter().next().is_none() {
            return Err(Error::Config("at least one allowed type is required".to_string()));
        }
        Ok(self)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            types: self.types.clone(),
            fold_constant_rows: self.fold_constant_rows,
            clear_freed_stack_slots: self.clear_freed_stack_slots,
        }
    }
}
