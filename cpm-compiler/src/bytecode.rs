//! Host instruction vocabulary
//!
//! Loop bodies arrive as a straight-line stream of stack-machine
//! instructions. Only a subset of [`Opcode`] is supported by the
//! recompiler; the rest exist so that real host streams can be expressed
//! and rejected with a precise error.

use std::fmt;

use cpm_core::{BinaryOp, UnaryOp, Value};
use serde::{Deserialize, Serialize};

/// Storage class of a variable reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarScope {
    /// Resolved at run time: locals first, then globals
    Name,
    Global,
    Fast,
    Deref,
}

impl VarScope {
    pub fn prefix(self) -> &'static str {
        match self {
            VarScope::Name => "name",
            VarScope::Global => "global",
            VarScope::Fast => "fast",
            VarScope::Deref => "deref",
        }
    }

    pub fn load_opcode(self) -> Opcode {
        match self {
            VarScope::Name => Opcode::LoadName,
            VarScope::Global => Opcode::LoadGlobal,
            VarScope::Fast => Opcode::LoadFast,
            VarScope::Deref => Opcode::LoadDeref,
        }
    }

    pub fn store_opcode(self) -> Opcode {
        match self {
            VarScope::Name => Opcode::StoreName,
            VarScope::Global => Opcode::StoreGlobal,
            VarScope::Fast => Opcode::StoreFast,
            VarScope::Deref => Opcode::StoreDeref,
        }
    }
}

/// A host variable: two references are the same variable iff they name
/// the same storage location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarRef {
    pub scope: VarScope,
    pub name: String,
}

impl VarRef {
    pub fn new(scope: VarScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    pub fn fast(name: impl Into<String>) -> Self {
        Self::new(VarScope::Fast, name)
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new(VarScope::Global, name)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(VarScope::Name, name)
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope.prefix(), self.name)
    }
}

macro_rules! opcodes {
    ($($variant:ident => $name:literal,)*) => {
        /// Closed set of host opcodes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    Nop => "NOP",
    PopTop => "POP_TOP",
    RotTwo => "ROT_TWO",
    RotThree => "ROT_THREE",
    RotFour => "ROT_FOUR",
    DupTop => "DUP_TOP",
    DupTopX => "DUP_TOPX",

    UnaryPositive => "UNARY_POSITIVE",
    UnaryNegative => "UNARY_NEGATIVE",
    UnaryNot => "UNARY_NOT",
    UnaryInvert => "UNARY_INVERT",

    BinaryPower => "BINARY_POWER",
    BinaryMultiply => "BINARY_MULTIPLY",
    BinaryDivide => "BINARY_DIVIDE",
    BinaryFloorDivide => "BINARY_FLOOR_DIVIDE",
    BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
    BinaryModulo => "BINARY_MODULO",
    BinaryAdd => "BINARY_ADD",
    BinarySubtract => "BINARY_SUBTRACT",
    BinaryLShift => "BINARY_LSHIFT",
    BinaryRShift => "BINARY_RSHIFT",
    BinaryAnd => "BINARY_AND",
    BinaryXor => "BINARY_XOR",
    BinaryOr => "BINARY_OR",

    InplacePower => "INPLACE_POWER",
    InplaceMultiply => "INPLACE_MULTIPLY",
    InplaceDivide => "INPLACE_DIVIDE",
    InplaceFloorDivide => "INPLACE_FLOOR_DIVIDE",
    InplaceTrueDivide => "INPLACE_TRUE_DIVIDE",
    InplaceModulo => "INPLACE_MODULO",
    InplaceAdd => "INPLACE_ADD",
    InplaceSubtract => "INPLACE_SUBTRACT",
    InplaceLShift => "INPLACE_LSHIFT",
    InplaceRShift => "INPLACE_RSHIFT",
    InplaceAnd => "INPLACE_AND",
    InplaceXor => "INPLACE_XOR",
    InplaceOr => "INPLACE_OR",

    LoadConst => "LOAD_CONST",
    LoadName => "LOAD_NAME",
    StoreName => "STORE_NAME",
    LoadGlobal => "LOAD_GLOBAL",
    StoreGlobal => "STORE_GLOBAL",
    LoadFast => "LOAD_FAST",
    StoreFast => "STORE_FAST",
    LoadDeref => "LOAD_DEREF",
    StoreDeref => "STORE_DEREF",

    SetLineno => "SET_LINENO",

    CompareOp => "COMPARE_OP",
    JumpAbsolute => "JUMP_ABSOLUTE",
    PopJumpIfFalse => "POP_JUMP_IF_FALSE",
    CallFunction => "CALL_FUNCTION",
    BinarySubscr => "BINARY_SUBSCR",
    BuildList => "BUILD_LIST",
    ReturnValue => "RETURN_VALUE",
}

impl Opcode {
    /// `(scope, is_store)` for variable loads and stores
    pub fn var_access(self) -> Option<(VarScope, bool)> {
        Some(match self {
            Opcode::LoadName => (VarScope::Name, false),
            Opcode::StoreName => (VarScope::Name, true),
            Opcode::LoadGlobal => (VarScope::Global, false),
            Opcode::StoreGlobal => (VarScope::Global, true),
            Opcode::LoadFast => (VarScope::Fast, false),
            Opcode::StoreFast => (VarScope::Fast, true),
            Opcode::LoadDeref => (VarScope::Deref, false),
            Opcode::StoreDeref => (VarScope::Deref, true),
            _ => return None,
        })
    }

    pub fn unary_op(self) -> Option<UnaryOp> {
        Some(match self {
            Opcode::UnaryPositive => UnaryOp::Positive,
            Opcode::UnaryNegative => UnaryOp::Negative,
            Opcode::UnaryNot => UnaryOp::Not,
            Opcode::UnaryInvert => UnaryOp::Invert,
            _ => return None,
        })
    }

    /// Binary and in-place forms share the same operation
    pub fn binary_op(self) -> Option<BinaryOp> {
        use Opcode::*;
        Some(match self {
            BinaryPower | InplacePower => BinaryOp::Power,
            BinaryMultiply | InplaceMultiply => BinaryOp::Multiply,
            BinaryDivide | InplaceDivide => BinaryOp::Divide,
            BinaryFloorDivide | InplaceFloorDivide => BinaryOp::FloorDivide,
            BinaryTrueDivide | InplaceTrueDivide => BinaryOp::TrueDivide,
            BinaryModulo | InplaceModulo => BinaryOp::Modulo,
            BinaryAdd | InplaceAdd => BinaryOp::Add,
            BinarySubtract | InplaceSubtract => BinaryOp::Subtract,
            BinaryLShift | InplaceLShift => BinaryOp::LShift,
            BinaryRShift | InplaceRShift => BinaryOp::RShift,
            BinaryAnd | InplaceAnd => BinaryOp::And,
            BinaryXor | InplaceXor => BinaryOp::Xor,
            BinaryOr | InplaceOr => BinaryOp::Or,
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    None,
    Const(Value),
    Name(String),
    Count(usize),
    Line(u32),
}

/// One host instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: Arg,
}

impl Instruction {
    pub fn new(opcode: Opcode, arg: Arg) -> Self {
        Self { opcode, arg }
    }

    /// Instruction without argument
    pub fn op(opcode: Opcode) -> Self {
        Self::new(opcode, Arg::None)
    }

    pub fn load_const(value: impl Into<Value>) -> Self {
        Self::new(Opcode::LoadConst, Arg::Const(value.into()))
    }

    pub fn load(var: &VarRef) -> Self {
        Self::new(var.scope.load_opcode(), Arg::Name(var.name.clone()))
    }

    pub fn store(var: &VarRef) -> Self {
        Self::new(var.scope.store_opcode(), Arg::Name(var.name.clone()))
    }

    pub fn load_fast(name: &str) -> Self {
        Self::load(&VarRef::fast(name))
    }

    pub fn store_fast(name: &str) -> Self {
        Self::store(&VarRef::fast(name))
    }

    pub fn dup_topx(count: usize) -> Self {
        Self::new(Opcode::DupTopX, Arg::Count(count))
    }

    pub fn set_lineno(line: u32) -> Self {
        Self::new(Opcode::SetLineno, Arg::Line(line))
    }

    /// Variable referenced by a load/store instruction
    pub fn var_ref(&self) -> Option<(VarRef, bool)> {
        let (scope, is_store) = self.opcode.var_access()?;
        match &self.arg {
            Arg::Name(name) => Some((VarRef::new(scope, name.clone()), is_store)),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.arg {
            Arg::None => Ok(()),
            Arg::Const(v) => write!(f, " {}", v),
            Arg::Name(name) => write!(f, " {}", name),
            Arg::Count(n) => write!(f, " {}", n),
            Arg::Line(line) => write!(f, " {}", line),
        }
    }
}
