//! Opcode handlers
//!
//! Every supported opcode replays its effect on the symbolic stack. Work
//! on foldable entries is accumulated into their fold programs; work that
//! touches a value living in the matrix is emitted as matrix code on the
//! stack-backed slots.

use std::collections::HashMap;

use cpm_core::{BinaryOp, Instr, UnaryOp};
use num_bigint::BigInt;
use once_cell::sync::Lazy;

use super::state::{Binding, RecompilerState, StackEntry, Straight};
use crate::bytecode::{Arg, Instruction, Opcode};
use crate::error::CompileErrorKind;
use crate::fold::FoldOp;

type Result<T> = std::result::Result<T, CompileErrorKind>;

/// Handler function type for one host instruction
pub(crate) type OpcodeHandler = fn(&mut RecompilerState, &Instruction) -> Result<()>;

/// Dispatch table, built once
pub(crate) static HANDLERS: Lazy<HashMap<Opcode, OpcodeHandler>> = Lazy::new(|| {
    Opcode::ALL
        .iter()
        .filter_map(|&opcode| get_handler(opcode).map(|handler| (opcode, handler)))
        .collect()
});

fn get_handler(opcode: Opcode) -> Option<OpcodeHandler> {
    use Opcode::*;

    let handler: OpcodeHandler = match opcode {
        // Stack shape
        Nop => op_nop,
        PopTop => op_pop_top,
        RotTwo => op_rot_two,
        RotThree => op_rot_three,
        RotFour => op_rot_four,
        DupTop => op_dup_top,
        DupTopX => op_dup_topx,

        // Unary
        UnaryPositive => op_unary_positive,
        UnaryNegative => op_unary_negative,
        UnaryNot | UnaryInvert => op_unary_const,

        // Affine binary
        BinaryMultiply | InplaceMultiply => op_multiply,
        BinaryAdd | InplaceAdd => op_add,
        BinarySubtract | InplaceSubtract => op_subtract,

        // Foldable only
        BinaryPower | BinaryDivide | BinaryFloorDivide | BinaryTrueDivide | BinaryModulo
        | BinaryLShift | BinaryRShift | BinaryAnd | BinaryXor | BinaryOr => op_binary_const,
        InplacePower | InplaceDivide | InplaceFloorDivide | InplaceTrueDivide | InplaceModulo
        | InplaceLShift | InplaceRShift | InplaceAnd | InplaceXor | InplaceOr => op_binary_const,

        // Data
        LoadConst => op_load_const,
        LoadName | LoadGlobal | LoadFast | LoadDeref => op_load_var,
        StoreName | StoreGlobal | StoreFast | StoreDeref => op_store_var,

        // Line markers are consumed by the driver
        SetLineno => return None,

        // Control flow and containers
        CompareOp | JumpAbsolute | PopJumpIfFalse | CallFunction | BinarySubscr | BuildList
        | ReturnValue => return None,
    };
    Some(handler)
}

fn unsupported(instr: &Instruction) -> CompileErrorKind {
    CompileErrorKind::UnsupportedInstruction(instr.to_string())
}

fn unpredictable(instr: &Instruction) -> CompileErrorKind {
    CompileErrorKind::UnpredictableOperands(instr.opcode.name().to_string())
}

fn is_foldable(state: &RecompilerState, depth: usize) -> Result<bool> {
    Ok(state.peek(depth)?.is_foldable())
}

// ═══════════════════════════════════════════════════════════════════
// Stack shape
// ═══════════════════════════════════════════════════════════════════

fn op_nop(_state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    Ok(())
}

fn op_pop_top(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    if !is_foldable(state, 0)? {
        state.clear_tos(0)?;
    }
    state.pop().map(drop)
}

/// Moves the top entry `count - 1` positions down. Unpredictable entries
/// are shifted slot by slot; the top one goes through the free slot.
fn rotate(state: &mut RecompilerState, count: usize) -> Result<()> {
    state.require(count)?;
    let count = count as isize;

    let top_unpredictable = !is_foldable(state, 0)?;
    if top_unpredictable {
        state.mov_tos(-1, 0)?;
    }
    for offset in 0..count - 1 {
        if !is_foldable(state, (offset + 1) as usize)? {
            state.mov_tos(offset, offset + 1)?;
        }
    }
    if top_unpredictable {
        state.mov_tos(count - 1, -1)?;
        state.clear_tos(-1)?;
    }
    state.rotate(count as usize)
}

fn op_rot_two(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    rotate(state, 2)
}

fn op_rot_three(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    rotate(state, 3)
}

fn op_rot_four(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    rotate(state, 4)
}

/// Pushes copies of the `count` top entries in their original order
fn duplicate(state: &mut RecompilerState, count: usize) -> Result<()> {
    state.require(count)?;
    for index in 0..count {
        let src = count - 1 - index;
        if !is_foldable(state, src)? {
            state.mov_tos(-1 - index as isize, src as isize)?;
        }
    }
    state.duplicate(count)
}

fn op_dup_top(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    duplicate(state, 1)
}

fn op_dup_topx(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    match instr.arg {
        Arg::Count(count) => duplicate(state, count),
        _ => Err(unsupported(instr)),
    }
}

// ═══════════════════════════════════════════════════════════════════
// Unary
// ═══════════════════════════════════════════════════════════════════

/// Appends `op` to the fold program on top, if there is one
fn fold_unary(state: &mut RecompilerState, op: UnaryOp) -> Result<bool> {
    match state.peek_mut(0)? {
        StackEntry::Foldable(program) => {
            program.push(FoldOp::Unary(op));
            Ok(true)
        }
        StackEntry::Unpredictable => Ok(false),
    }
}

fn op_unary_positive(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    state.require(1)
}

fn op_unary_negative(state: &mut RecompilerState, _instr: &Instruction) -> Result<()> {
    if !fold_unary(state, UnaryOp::Negative)? {
        state.emit(Instr::Mul(Straight::Tos(0), Straight::Value(BigInt::from(-1))))?;
    }
    Ok(())
}

fn op_unary_const(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let op = instr.opcode.unary_op().ok_or_else(|| unsupported(instr))?;
    if fold_unary(state, op)? {
        Ok(())
    } else {
        Err(unpredictable(instr))
    }
}

// ═══════════════════════════════════════════════════════════════════
// Binary
// ═══════════════════════════════════════════════════════════════════

/// Operand foldability as `(second, top)`
fn operands(state: &RecompilerState) -> Result<(bool, bool)> {
    Ok((is_foldable(state, 1)?, is_foldable(state, 0)?))
}

/// Merges the two foldable entries on top into one
fn fold_binary(state: &mut RecompilerState, op: BinaryOp) -> Result<()> {
    let rhs = state.pop()?;
    match (state.peek_mut(0)?, rhs) {
        (StackEntry::Foldable(lhs), StackEntry::Foldable(rhs)) => {
            lhs.extend(rhs);
            lhs.push(FoldOp::Binary(op));
            Ok(())
        }
        _ => Err(CompileErrorKind::InvalidStack),
    }
}

/// The result computed in the top slot replaces the foldable second entry
fn sink_result(state: &mut RecompilerState) -> Result<()> {
    state.mov_tos(1, 0)?;
    state.clear_tos(0)?;
    *state.peek_mut(1)? = StackEntry::Unpredictable;
    state.pop().map(drop)
}

fn op_multiply(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let op = instr.opcode.binary_op().ok_or_else(|| unsupported(instr))?;
    match operands(state)? {
        (true, true) => fold_binary(state, op),
        (true, false) => {
            state.emit(Instr::Mul(Straight::Tos(0), Straight::FoldTos(1)))?;
            sink_result(state)
        }
        (false, true) => {
            state.emit(Instr::Mul(Straight::Tos(1), Straight::FoldTos(0)))?;
            state.pop().map(drop)
        }
        (false, false) => Err(CompileErrorKind::UnpredictableMultiplication),
    }
}

fn op_add(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let op = instr.opcode.binary_op().ok_or_else(|| unsupported(instr))?;
    match operands(state)? {
        (true, true) => fold_binary(state, op),
        (true, false) => {
            state.emit(Instr::Add(Straight::Tos(0), Straight::FoldTos(1)))?;
            sink_result(state)
        }
        (false, true) => {
            state.emit(Instr::Add(Straight::Tos(1), Straight::FoldTos(0)))?;
            state.pop().map(drop)
        }
        (false, false) => {
            state.emit(Instr::Add(Straight::Tos(1), Straight::Tos(0)))?;
            state.clear_tos(0)?;
            state.pop().map(drop)
        }
    }
}

fn op_subtract(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let op = instr.opcode.binary_op().ok_or_else(|| unsupported(instr))?;
    match operands(state)? {
        (true, true) => fold_binary(state, op),
        (true, false) => {
            // a - b as (-b) + a, computed in b's slot
            state.emit(Instr::Mul(Straight::Tos(0), Straight::Value(BigInt::from(-1))))?;
            state.emit(Instr::Add(Straight::Tos(0), Straight::FoldTos(1)))?;
            sink_result(state)
        }
        (false, true) => {
            state.emit(Instr::Sub(Straight::Tos(1), Straight::FoldTos(0)))?;
            state.pop().map(drop)
        }
        (false, false) => {
            state.emit(Instr::Sub(Straight::Tos(1), Straight::Tos(0)))?;
            state.clear_tos(0)?;
            state.pop().map(drop)
        }
    }
}

fn op_binary_const(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let op = instr.opcode.binary_op().ok_or_else(|| unsupported(instr))?;
    match operands(state)? {
        (true, true) => fold_binary(state, op),
        _ => Err(unpredictable(instr)),
    }
}

// ═══════════════════════════════════════════════════════════════════
// Data
// ═══════════════════════════════════════════════════════════════════

fn op_load_const(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let Arg::Const(value) = &instr.arg else {
        return Err(unsupported(instr));
    };
    let types = &state.options().types;
    if !types.allows(value) {
        return Err(CompileErrorKind::DisallowedConstant {
            value: value.to_string(),
            kind: value.kind(),
            allowed: types.to_string(),
        });
    }
    state.push(StackEntry::Foldable(vec![FoldOp::Push(value.clone())]));
    Ok(())
}

fn op_load_var(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let (var, _) = instr.var_ref().ok_or_else(|| unsupported(instr))?;
    let binding = match state.binding(&var) {
        Some(binding) => binding,
        None => state.register(&var, false),
    };
    match binding {
        Binding::Const(index) => {
            state.push(StackEntry::Foldable(vec![FoldOp::LoadFolded(index)]));
        }
        Binding::Var => {
            state.emit(Instr::Mov(Straight::Tos(-1), Straight::Host(var)))?;
            state.push(StackEntry::Unpredictable);
        }
    }
    Ok(())
}

fn op_store_var(state: &mut RecompilerState, instr: &Instruction) -> Result<()> {
    let (var, _) = instr.var_ref().ok_or_else(|| unsupported(instr))?;
    let program = match state.peek(0)? {
        StackEntry::Foldable(program) => Some(program.clone()),
        StackEntry::Unpredictable => None,
    };
    match program {
        Some(program) => {
            let index = state.add_const(program);
            state.emit(Instr::Mov(Straight::Host(var.clone()), Straight::Const(index)))?;
            state.rebind(&var, Binding::Const(index));
        }
        None => {
            state.emit(Instr::Mov(Straight::Host(var.clone()), Straight::Tos(0)))?;
            state.clear_tos(0)?;
            state.rebind(&var, Binding::Var);
        }
    }
    state.pop().map(drop)
}
