//! Symbolic stack interpreter
//!
//! Walks a loop body once and produces matrix code for one iteration,
//! wrapped in `LOOP iters_count … END`. The first body instruction stores
//! the loop target; the rest must be affine in the loop's variables.

mod counter;
mod handlers;
mod state;

use std::collections::HashSet;

use cpm_core::matcode::disassemble;
use cpm_core::{Instr, Operand, Param};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytecode::{Arg, Instruction, Opcode, VarRef};
use crate::error::{CompileError, CompileErrorKind, Result};
use crate::fold::FoldProgram;
use crate::options::CompileOptions;

pub use counter::{CounterStatus, classify as classify_counter};
pub use state::SlotKey;

use handlers::HANDLERS;
use state::{RecompilerState, Straight};

/// One entry of the unified variable table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: SlotKey,
    /// Value must be stored back to the host variable after the loop
    pub write_back: bool,
}

/// A recompiled loop, immutable and shareable between invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledLoop {
    pub matcode: Vec<Instr<Operand>>,
    pub slots: Vec<Slot>,
    /// Evaluated in order before each accelerated run
    pub consts: Vec<FoldProgram>,
    /// Loop target, `None` for an empty body
    pub counter: Option<VarRef>,
    pub counter_status: CounterStatus,
    /// The target never reaches the matrix and gets the last progression
    /// value directly
    pub store_counter: bool,
}

impl CompiledLoop {
    /// `(slot, variable)` for every slot stored back to the host
    pub fn write_back_slots(&self) -> impl Iterator<Item = (usize, &VarRef)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match &slot.key {
            SlotKey::Host(var) if slot.write_back => Some((index, var)),
            _ => None,
        })
    }

    pub fn disassemble(&self) -> String {
        disassemble(&self.matcode)
    }
}

fn locate(state: &RecompilerState, instr: Option<&Instruction>) -> impl FnOnce(CompileErrorKind) -> CompileError {
    let line = state.line;
    let text = instr.map(ToString::to_string);
    move |kind| CompileError::new(kind, text, line)
}

fn line_marker(state: &mut RecompilerState, instr: &Instruction) -> bool {
    if instr.opcode != Opcode::SetLineno {
        return false;
    }
    if let Arg::Line(line) = instr.arg {
        state.line = Some(line);
    }
    true
}

/// Recompiles a loop body into matrix code.
///
/// `head_line` is the source line of the loop header, reported by errors
/// raised before the first line marker.
pub fn recompile(body: &[Instruction], options: &CompileOptions, head_line: Option<u32>) -> Result<CompiledLoop> {
    let mut state = RecompilerState::new(options, head_line);

    let mut rest = body;
    while let Some((first, tail)) = rest.split_first() {
        if !line_marker(&mut state, first) {
            break;
        }
        rest = tail;
    }

    let Some((target, rest)) = rest.split_first() else {
        let loop_only = [Instr::Loop(Straight::Param(Param::ItersCount)), Instr::End];
        for instr in loop_only {
            state.emit(instr).map_err(locate(&state, None))?;
        }
        return Ok(finish(state, None, CounterStatus::Unused));
    };

    let counter = match target.var_ref() {
        Some((var, true)) => var,
        _ => {
            return Err(locate(&state, Some(target))(CompileErrorKind::UnsupportedIterator(
                target.to_string(),
            )));
        }
    };
    let status = if options.fold_constant_rows {
        counter::classify(&counter, rest)
    } else {
        CounterStatus::Mutated
    };

    if status != CounterStatus::Unused {
        state.register(&counter, true);
    }
    let stored: HashSet<VarRef> = rest
        .iter()
        .filter_map(Instruction::var_ref)
        .filter_map(|(var, is_store)| is_store.then_some(var))
        .collect();
    for (var, _) in rest.iter().filter_map(Instruction::var_ref) {
        let mutation = stored.contains(&var);
        state.register(&var, mutation);
    }

    let service = match status {
        CounterStatus::Unused => None,
        CounterStatus::ReadOnly => Some(Straight::Host(counter.clone())),
        CounterStatus::Mutated => Some(Straight::Counter),
    };

    let mut prologue = Vec::new();
    if let Some(service) = &service {
        prologue.push(Instr::Mov(service.clone(), Straight::Param(Param::Start)));
    }
    prologue.push(Instr::Loop(Straight::Param(Param::ItersCount)));
    if status == CounterStatus::Mutated {
        prologue.push(Instr::Mov(Straight::Host(counter.clone()), Straight::Counter));
    }
    for instr in prologue {
        state.emit(instr).map_err(locate(&state, Some(target)))?;
    }

    for instr in rest {
        if line_marker(&mut state, instr) {
            continue;
        }
        let handler = HANDLERS
            .get(&instr.opcode)
            .ok_or_else(|| locate(&state, Some(instr))(CompileErrorKind::UnsupportedInstruction(instr.to_string())))?;
        handler(&mut state, instr).map_err(locate(&state, Some(instr)))?;
    }
    if state.depth() != 0 {
        return Err(locate(&state, None)(CompileErrorKind::InvalidStack));
    }

    let mut epilogue = Vec::new();
    if let Some(service) = &service {
        epilogue.push(Instr::Add(service.clone(), Straight::Param(Param::Step)));
    }
    epilogue.push(Instr::End);
    if status == CounterStatus::ReadOnly {
        // The shadow slot was advanced once past the last value
        epilogue.push(Instr::Sub(Straight::Host(counter.clone()), Straight::Param(Param::Step)));
    }
    for instr in epilogue {
        state.emit(instr).map_err(locate(&state, None))?;
    }

    Ok(finish(state, Some(counter), status))
}

fn finish(state: RecompilerState, counter: Option<VarRef>, status: CounterStatus) -> CompiledLoop {
    let (matcode, keys, consts) = state.into_parts();
    let slots = keys
        .into_iter()
        .map(|key| Slot {
            write_back: matches!(key, SlotKey::Host(_)),
            key,
        })
        .collect::<Vec<_>>();

    debug!(
        instructions = matcode.len(),
        slots = slots.len(),
        consts = consts.len(),
        counter = ?status,
        "loop body recompiled"
    );

    CompiledLoop {
        matcode,
        slots,
        consts,
        store_counter: status == CounterStatus::Unused && counter.is_some(),
        counter,
        counter_status: status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold::FoldOp;
    use cpm_core::Value;

    fn body(instrs: &[Instruction]) -> Vec<Instruction> {
        let mut body = vec![Instruction::store_fast("i")];
        body.extend_from_slice(instrs);
        body
    }

    /// `x += i`
    fn accumulate() -> Vec<Instruction> {
        body(&[
            Instruction::load_fast("x"),
            Instruction::load_fast("i"),
            Instruction::op(Opcode::InplaceAdd),
            Instruction::store_fast("x"),
        ])
    }

    #[test]
    fn test_empty_body() {
        let compiled = recompile(&[], &CompileOptions::default(), None).unwrap();
        assert_eq!(
            compiled.matcode,
            vec![Instr::Loop(Operand::Param(Param::ItersCount)), Instr::End]
        );
        assert!(compiled.slots.is_empty());
        assert!(compiled.counter.is_none());
        assert!(!compiled.store_counter);
    }

    #[test]
    fn test_unused_counter_is_stored_after_loop() {
        let compiled = recompile(&body(&[Instruction::op(Opcode::Nop)]), &CompileOptions::default(), None).unwrap();
        assert_eq!(compiled.counter_status, CounterStatus::Unused);
        assert!(compiled.store_counter);
        assert!(compiled.slots.is_empty());
    }

    #[test]
    fn test_read_only_counter() {
        let compiled = recompile(&accumulate(), &CompileOptions::default(), None).unwrap();
        assert_eq!(compiled.counter_status, CounterStatus::ReadOnly);
        assert!(!compiled.store_counter);

        let i = Operand::Var(0);
        assert_eq!(compiled.matcode.first(), Some(&Instr::Mov(i.clone(), Operand::Param(Param::Start))));
        assert_eq!(compiled.matcode.last(), Some(&Instr::Sub(i, Operand::Param(Param::Step))));

        let vars: Vec<_> = compiled.write_back_slots().map(|(_, var)| var.name.as_str()).collect();
        assert_eq!(vars, vec!["i", "x"]);
    }

    #[test]
    fn test_mutated_counter_uses_service_slot() {
        let compiled = recompile(
            &body(&[
                Instruction::load_fast("i"),
                Instruction::load_const(2),
                Instruction::op(Opcode::InplaceMultiply),
                Instruction::store_fast("i"),
            ]),
            &CompileOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(compiled.counter_status, CounterStatus::Mutated);
        assert!(compiled.slots.iter().any(|slot| slot.key == SlotKey::Counter && !slot.write_back));
        assert!(matches!(compiled.matcode.last(), Some(Instr::End)));
    }

    #[test]
    fn test_no_row_folding_treats_counter_as_mutated() {
        let options = CompileOptions::with_flags(false, true);
        let compiled = recompile(&accumulate(), &options, None).unwrap();
        assert_eq!(compiled.counter_status, CounterStatus::Mutated);
    }

    #[test]
    fn test_read_only_variable_is_folded() {
        // x = x + k * 3
        let compiled = recompile(
            &body(&[
                Instruction::load_fast("x"),
                Instruction::load_fast("k"),
                Instruction::load_const(3),
                Instruction::op(Opcode::BinaryMultiply),
                Instruction::op(Opcode::BinaryAdd),
                Instruction::store_fast("x"),
            ]),
            &CompileOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(compiled.slots.iter().filter(|slot| slot.write_back).count(), 1);
        assert_eq!(compiled.consts[0], vec![FoldOp::LoadVar(VarRef::fast("k"))]);
        assert_eq!(
            compiled.consts[1],
            vec![
                FoldOp::LoadFolded(0),
                FoldOp::Push(Value::from(3)),
                FoldOp::Binary(cpm_core::BinaryOp::Multiply),
            ]
        );
    }

    #[test]
    fn test_multiplication_of_unpredictable_values_is_rejected() {
        // x = x * y; y += 1
        let instrs = body(&[
            Instruction::load_fast("x"),
            Instruction::load_fast("y"),
            Instruction::op(Opcode::BinaryMultiply),
            Instruction::store_fast("x"),
            Instruction::load_fast("y"),
            Instruction::load_const(1),
            Instruction::op(Opcode::InplaceAdd),
            Instruction::store_fast("y"),
        ]);
        for fold in [false, true] {
            for clear in [false, true] {
                let err = recompile(&instrs, &CompileOptions::with_flags(fold, clear), None).unwrap_err();
                assert_eq!(err.kind, CompileErrorKind::UnpredictableMultiplication);
            }
        }
    }

    #[test]
    fn test_error_reports_latest_line() {
        let err = recompile(
            &body(&[
                Instruction::set_lineno(7),
                Instruction::load_fast("x"),
                Instruction::op(Opcode::ReturnValue),
            ]),
            &CompileOptions::default(),
            Some(5),
        )
        .unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnsupportedInstruction("RETURN_VALUE".into()));
        assert_eq!(err.line, Some(7));
        assert_eq!(err.instruction.as_deref(), Some("RETURN_VALUE"));
    }

    #[test]
    fn test_error_falls_back_to_head_line() {
        let err = recompile(
            &body(&[Instruction::load_const(1.5), Instruction::store_fast("x")]),
            &CompileOptions::default(),
            Some(5),
        )
        .unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::DisallowedConstant { .. }));
        assert_eq!(err.line, Some(5));
    }

    #[test]
    fn test_target_must_be_a_store() {
        let err = recompile(&[Instruction::load_fast("i")], &CompileOptions::default(), None).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnsupportedIterator("LOAD_FAST i".into()));
    }

    #[test]
    fn test_unbalanced_stack_is_rejected() {
        let leftover = recompile(&body(&[Instruction::load_const(1)]), &CompileOptions::default(), None);
        assert_eq!(leftover.unwrap_err().kind, CompileErrorKind::InvalidStack);

        let underflow = recompile(&body(&[Instruction::op(Opcode::PopTop)]), &CompileOptions::default(), None);
        assert_eq!(underflow.unwrap_err().kind, CompileErrorKind::InvalidStack);
    }

    #[test]
    fn test_non_affine_operation_on_variable_is_rejected() {
        let err = recompile(
            &body(&[
                Instruction::load_fast("x"),
                Instruction::load_const(2),
                Instruction::op(Opcode::InplaceModulo),
                Instruction::store_fast("x"),
            ]),
            &CompileOptions::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnpredictableOperands("INPLACE_MODULO".into()));
    }

    #[test]
    fn test_compiled_loop_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledLoop>();
    }
}
