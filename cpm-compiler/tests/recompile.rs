//! Integration tests for the recompiler's public surface

use cpm_compiler::*;
use cpm_core::{Value, ValueKind};

fn sum_body() -> Vec<Instruction> {
    vec![
        Instruction::store_fast("i"),
        Instruction::load_fast("res"),
        Instruction::load_fast("i"),
        Instruction::op(Opcode::InplaceAdd),
        Instruction::store_fast("res"),
    ]
}

#[test]
fn test_sum_loop_matrix_code() {
    let compiled = recompile(&sum_body(), &CompileOptions::default(), None).unwrap();
    let expected = "\
MOV var0, start
LOOP iters_count
    MOV var2, var1
    MOV var3, var0
    ADD var2, var3
    MOV var3, 0
    MOV var1, var2
    MOV var2, 0
    ADD var0, step
END
SUB var0, step
";
    assert_eq!(compiled.disassemble(), expected);
    assert_eq!(
        compiled.slots.iter().map(|slot| slot.key.clone()).collect::<Vec<_>>(),
        vec![
            SlotKey::Host(VarRef::fast("i")),
            SlotKey::Host(VarRef::fast("res")),
            SlotKey::Stack(0),
            SlotKey::Stack(1),
        ]
    );
    assert_eq!(compiled.write_back_slots().count(), 2);
}

#[test]
fn test_freed_slots_are_kept_when_asked() {
    let options = CompileOptions::with_flags(true, false);
    let compiled = recompile(&sum_body(), &options, None).unwrap();
    assert!(!compiled.disassemble().contains(", 0\n"));
}

#[test]
fn test_leading_line_markers_are_skipped() {
    let mut body = vec![Instruction::set_lineno(3), Instruction::set_lineno(4)];
    body.extend(sum_body());
    let with_markers = recompile(&body, &CompileOptions::default(), None).unwrap();
    let plain = recompile(&sum_body(), &CompileOptions::default(), None).unwrap();
    assert_eq!(with_markers, plain);
}

#[test]
fn test_control_flow_is_rejected() {
    for opcode in [
        Opcode::CompareOp,
        Opcode::BuildList,
        Opcode::CallFunction,
        Opcode::JumpAbsolute,
    ] {
        let body = vec![Instruction::store_fast("i"), Instruction::op(opcode)];
        let err = recompile(&body, &CompileOptions::default(), Some(1)).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnsupportedInstruction(opcode.name().to_string()));
        assert_eq!(err.line, Some(1));
    }
}

#[test]
fn test_logic_on_variables_is_rejected() {
    // x = not x
    let body = vec![
        Instruction::store_fast("i"),
        Instruction::load_fast("x"),
        Instruction::op(Opcode::UnaryNot),
        Instruction::store_fast("x"),
    ];
    let err = recompile(&body, &CompileOptions::default(), None).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::UnpredictableOperands("UNARY_NOT".into()));

    // ...but on constants it folds: x = x + (not 0)
    let options = CompileOptions {
        types: cpm_core::TypeSet::new([ValueKind::Int, ValueKind::Bool]),
        ..CompileOptions::default()
    };
    let body = vec![
        Instruction::store_fast("i"),
        Instruction::load_fast("x"),
        Instruction::load_const(0),
        Instruction::op(Opcode::UnaryNot),
        Instruction::op(Opcode::BinaryAdd),
        Instruction::store_fast("x"),
    ];
    let compiled = recompile(&body, &options, None).unwrap();
    assert_eq!(
        compiled.consts,
        vec![vec![FoldOp::Push(Value::from(0)), FoldOp::Unary(cpm_core::UnaryOp::Not)]]
    );
}

#[test]
fn test_bool_constant_counts_as_int() {
    let body = vec![
        Instruction::store_fast("i"),
        Instruction::load_const(true),
        Instruction::store_fast("flag"),
    ];
    let compiled = recompile(&body, &CompileOptions::default(), None).unwrap();
    assert_eq!(compiled.consts, vec![vec![FoldOp::Push(Value::Bool(true))]]);

    // The reverse does not hold: a bool-only set rejects ints
    let options = CompileOptions {
        types: cpm_core::TypeSet::new([ValueKind::Bool]),
        ..CompileOptions::default()
    };
    let body = vec![
        Instruction::store_fast("i"),
        Instruction::load_const(3),
        Instruction::store_fast("flag"),
    ];
    let err = recompile(&body, &options, None).unwrap_err();
    assert_eq!(
        err.kind,
        CompileErrorKind::DisallowedConstant {
            value: "3".into(),
            kind: ValueKind::Int,
            allowed: "bool".into(),
        }
    );
}
