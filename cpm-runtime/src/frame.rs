//! Host variable storage

use std::collections::HashMap;

use cpm_compiler::{VarRef, VarScope};
use cpm_core::Value;

/// Locals and globals of the function that owns the loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub locals: HashMap<String, Value>,
    pub globals: HashMap<String, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.locals.insert(name.to_string(), value.into());
        self
    }

    pub fn with_global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.insert(name.to_string(), value.into());
        self
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// NAME looks in locals, then globals
    pub fn load(&self, var: &VarRef) -> Option<&Value> {
        match var.scope {
            VarScope::Name => self.locals.get(&var.name).or_else(|| self.globals.get(&var.name)),
            VarScope::Global => self.globals.get(&var.name),
            VarScope::Fast | VarScope::Deref => self.locals.get(&var.name),
        }
    }

    pub fn store(&mut self, var: &VarRef, value: Value) {
        let space = match var.scope {
            VarScope::Global => &mut self.globals,
            VarScope::Name | VarScope::Fast | VarScope::Deref => &mut self.locals,
        };
        space.insert(var.name.clone(), value);
    }
}
