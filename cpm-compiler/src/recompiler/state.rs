//! Symbolic stack and unified variable table

use std::collections::HashMap;

use cpm_core::{Instr, Operand, Param};
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::bytecode::VarRef;
use crate::error::CompileErrorKind;
use crate::fold::{FoldOp, FoldProgram, folded_ref};
use crate::options::CompileOptions;

type Result<T> = std::result::Result<T, CompileErrorKind>;

/// Key of a slot in the unified variable table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKey {
    /// Host variable, written back after the loop
    Host(VarRef),
    /// Internal copy of the loop counter
    Counter,
    /// Value living at an absolute symbolic stack depth
    Stack(usize),
}

/// Symbolic stack entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StackEntry {
    /// Value known before the loop starts, as the ops that compute it
    Foldable(FoldProgram),
    /// Value lives in the matrix, in the `Stack(depth)` slot
    Unpredictable,
}

impl StackEntry {
    pub fn is_foldable(&self) -> bool {
        matches!(self, StackEntry::Foldable(_))
    }
}

/// Operand as written by handlers, before translation to [`Operand`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Straight {
    Value(BigInt),
    Const(usize),
    Param(Param),
    Host(VarRef),
    Counter,
    /// Stack slot relative to the top: 0 is the top, -1 the free slot above
    Tos(isize),
    /// Folded constant made from the foldable entry at this depth
    FoldTos(usize),
}

/// Current meaning of a host variable inside the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Live matrix variable
    Var,
    /// Folded constant `i`
    Const(usize),
}

pub(crate) struct RecompilerState {
    options: CompileOptions,
    /// Last line marker seen
    pub line: Option<u32>,
    stack: Vec<StackEntry>,
    code: Vec<Instr<Operand>>,
    slots: Vec<SlotKey>,
    slot_index: HashMap<SlotKey, usize>,
    bindings: HashMap<VarRef, Binding>,
    consts: Vec<FoldProgram>,
}

impl RecompilerState {
    pub fn new(options: &CompileOptions, line: Option<u32>) -> Self {
        Self {
            options: options.clone(),
            line,
            stack: Vec::new(),
            code: Vec::new(),
            slots: Vec::new(),
            slot_index: HashMap::new(),
            bindings: HashMap::new(),
            consts: Vec::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    // ═══════════════════════════════════════════════════════════════
    // Symbolic stack
    // ═══════════════════════════════════════════════════════════════

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Entry `depth` positions below the top
    pub fn peek(&self, depth: usize) -> Result<&StackEntry> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .map(|index| &self.stack[index])
            .ok_or(CompileErrorKind::InvalidStack)
    }

    pub fn peek_mut(&mut self, depth: usize) -> Result<&mut StackEntry> {
        let index = self
            .stack
            .len()
            .checked_sub(depth + 1)
            .ok_or(CompileErrorKind::InvalidStack)?;
        Ok(&mut self.stack[index])
    }

    pub fn push(&mut self, entry: StackEntry) {
        self.stack.push(entry);
    }

    pub fn pop(&mut self) -> Result<StackEntry> {
        self.stack.pop().ok_or(CompileErrorKind::InvalidStack)
    }

    /// Fails unless at least `count` entries are on the stack
    pub fn require(&self, count: usize) -> Result<()> {
        if self.stack.len() < count {
            return Err(CompileErrorKind::InvalidStack);
        }
        Ok(())
    }

    /// Moves the top entry `count - 1` positions down
    pub fn rotate(&mut self, count: usize) -> Result<()> {
        self.require(count)?;
        let start = self.stack.len() - count;
        self.stack[start..].rotate_right(1);
        Ok(())
    }

    /// Pushes copies of the `count` top entries, preserving their order
    pub fn duplicate(&mut self, count: usize) -> Result<()> {
        self.require(count)?;
        let start = self.stack.len() - count;
        self.stack.extend_from_within(start..);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Variables and constants
    // ═══════════════════════════════════════════════════════════════

    fn slot(&mut self, key: SlotKey) -> usize {
        if let Some(&index) = self.slot_index.get(&key) {
            return index;
        }
        let index = self.slots.len();
        self.slots.push(key.clone());
        self.slot_index.insert(key, index);
        index
    }

    /// Registers a variable seen in the body. A variable stored anywhere
    /// is a live matrix variable from the start; one that is only read
    /// becomes a folded load of its value.
    pub fn register(&mut self, var: &VarRef, mutation: bool) -> Binding {
        let binding = match self.bindings.get(var).copied() {
            Some(Binding::Const(_)) | None if mutation => {
                self.slot(SlotKey::Host(var.clone()));
                Binding::Var
            }
            Some(binding) => binding,
            None => Binding::Const(self.add_const(vec![FoldOp::LoadVar(var.clone())])),
        };
        self.bindings.insert(var.clone(), binding);
        binding
    }

    pub fn binding(&self, var: &VarRef) -> Option<Binding> {
        self.bindings.get(var).copied()
    }

    pub fn rebind(&mut self, var: &VarRef, binding: Binding) {
        self.bindings.insert(var.clone(), binding);
    }

    /// Registers a folded constant; a bare re-read of constant `i` is `i`
    pub fn add_const(&mut self, program: FoldProgram) -> usize {
        if let Some(index) = folded_ref(&program) {
            return index;
        }
        self.consts.push(program);
        self.consts.len() - 1
    }

    // ═══════════════════════════════════════════════════════════════
    // Matrix code emission
    // ═══════════════════════════════════════════════════════════════

    fn translate(&mut self, arg: &Straight) -> Result<Operand> {
        Ok(match arg {
            Straight::Value(v) => Operand::Value(v.clone()),
            Straight::Const(i) => Operand::Const(*i),
            Straight::Param(p) => Operand::Param(*p),
            Straight::Host(var) => Operand::Var(self.slot(SlotKey::Host(var.clone()))),
            Straight::Counter => Operand::Var(self.slot(SlotKey::Counter)),
            Straight::Tos(offset) => {
                let depth = self.stack.len() as isize - 1 - offset;
                if depth < 0 {
                    return Err(CompileErrorKind::InvalidStack);
                }
                Operand::Var(self.slot(SlotKey::Stack(depth as usize)))
            }
            Straight::FoldTos(depth) => {
                let program = match self.peek(*depth)? {
                    StackEntry::Foldable(program) => program.clone(),
                    StackEntry::Unpredictable => return Err(CompileErrorKind::InvalidStack),
                };
                Operand::Const(self.add_const(program))
            }
        })
    }

    pub fn emit(&mut self, instr: Instr<Straight>) -> Result<()> {
        let instr = instr.resolve(|arg| self.translate(arg))?;
        self.code.push(instr);
        Ok(())
    }

    /// `MOV dest, src` on stack slots relative to the top
    pub fn mov_tos(&mut self, dest: isize, src: isize) -> Result<()> {
        self.emit(Instr::Mov(Straight::Tos(dest), Straight::Tos(src)))
    }

    /// Zeroes a freed stack slot when the option asks for it
    pub fn clear_tos(&mut self, offset: isize) -> Result<()> {
        if self.options.clear_freed_stack_slots {
            self.emit(Instr::Mov(Straight::Tos(offset), Straight::Value(BigInt::zero())))?;
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<Instr<Operand>>, Vec<SlotKey>, Vec<FoldProgram>) {
        (self.code, self.slots, self.consts)
    }
}
