use crate::val::RoundingMode;

use super::*;

#[test]
fn mixed_type_accumulation() {
    let consts = vec![
        Value::Float(0.0),
        Value::Float(4.0),
        Value::Float(10.3),
        Value::Int(-1),
    ];
    let code = assemble(&[
        encode::reserve(Index::Const(1)).unwrap(),
        encode::push(1, Index::Const(2)).unwrap(),
        // ESP is a register like any other: shrink by writing through r2.
        encode::binary(Opcode::Add, Index::Reg(2), Index::Reg(2), Index::Const(3)).unwrap(),
        encode::load(Index::Reg(31), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(11), Index::Stack(-3)).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(11), Index::Reg(11), Index::Const(2)).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(11), Index::Reg(11), Index::Stack(3)).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(11), Index::Reg(11), Index::Reg(31)).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(11), Index::Reg(11), Index::Const(2)).unwrap(),
        encode::binary(Opcode::Sub, Index::Reg(4), Index::Reg(11), Index::Const(1)).unwrap(),
    ]);
    let mut th = thread_with(
        code,
        consts,
        vec![
            Value::Float(643.219),
            Value::Int(5),
            Value::Float(-123.45),
            Value::Int(1),
        ],
    );

    th.run().unwrap();

    assert_eq!(th.at(Index::Reg(4)).unwrap(), Value::Float(26.6));
    // The pushed constant was dropped again by the ESP write.
    assert_eq!(th.stack_len(), 4);
}

fn shift_scenario(op: Opcode) -> Thread {
    let consts = vec![
        Value::Uint(1003),
        Value::Float(-1003.0),
        Value::Float(4.0),
        Value::Float(-4.0),
    ];
    let code = assemble(&[
        encode::load(Index::Reg(3), Index::Const(0)).unwrap(),
        encode::load(Index::Reg(6), Index::Const(1)).unwrap(),
        encode::binary(op, Index::Reg(4), Index::Reg(3), Index::Const(2)).unwrap(),
        encode::binary(op, Index::Reg(5), Index::Reg(3), Index::Const(3)).unwrap(),
        encode::binary(op, Index::Reg(7), Index::Reg(6), Index::Const(2)).unwrap(),
        encode::binary(op, Index::Reg(8), Index::Reg(6), Index::Const(3)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    th
}

#[test]
fn logical_shift_program() {
    let th = shift_scenario(Opcode::BShift);
    assert_eq!(th.at(Index::Reg(4)).unwrap(), Value::Uint(62));
    assert_eq!(th.at(Index::Reg(5)).unwrap(), Value::Uint(16048));
    assert_eq!(th.at(Index::Reg(7)).unwrap(), Value::Int(1152921504606846913));
    assert_eq!(th.at(Index::Reg(8)).unwrap(), Value::Int(-16048));
}

#[test]
fn arithmetic_shift_program() {
    let th = shift_scenario(Opcode::AShift);
    assert_eq!(th.at(Index::Reg(4)).unwrap(), Value::Uint(62));
    assert_eq!(th.at(Index::Reg(5)).unwrap(), Value::Uint(16048));
    // The sign-sensitive case is the only observable difference from the
    // logical variant.
    assert_eq!(th.at(Index::Reg(7)).unwrap(), Value::Int(-63));
    assert_eq!(th.at(Index::Reg(8)).unwrap(), Value::Int(-16048));
}

#[test]
fn unary_and_round_programs() {
    let consts = vec![Value::Float(-2.5), Value::Int(12)];
    let code = assemble(&[
        encode::load(Index::Reg(3), Index::Const(0)).unwrap(),
        encode::unary(Opcode::Neg, Index::Reg(4), Index::Reg(3)).unwrap(),
        encode::round(Index::Reg(5), RoundingMode::Nearest, Index::Const(0)).unwrap(),
        encode::round(Index::Reg(6), RoundingMode::Ceil, Index::Const(0)).unwrap(),
        encode::load(Index::Reg(8), Index::Const(1)).unwrap(),
        encode::unary(Opcode::Not, Index::Reg(7), Index::Reg(8)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();

    assert_eq!(th.at(Index::Reg(4)).unwrap(), Value::Float(2.5));
    assert_eq!(th.at(Index::Reg(5)).unwrap(), Value::Float(-3.0));
    assert_eq!(th.at(Index::Reg(6)).unwrap(), Value::Float(-2.0));
    assert_eq!(th.at(Index::Reg(7)).unwrap(), Value::Int(!12));
}

#[test]
fn division_by_zero_is_fatal() {
    let consts = vec![Value::Int(1), Value::Int(0)];
    let code = assemble(&[
        encode::load(Index::Reg(4), Index::Const(0)).unwrap(),
        encode::binary(Opcode::Div, Index::Reg(3), Index::Reg(4), Index::Const(1)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::DivisionByZero));
}

#[test]
fn arithmetic_on_empty_slots_is_a_type_fault() {
    let consts = vec![Value::Int(1)];
    let code = assemble(&[
        encode::binary(Opcode::Add, Index::Reg(3), Index::Reg(40), Index::Const(0)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::TypeFault("Empty")));
}

#[test]
fn loads_move_opaque_values_without_coercion() {
    // A foreign value without probes is storable and loadable; only
    // arithmetic rejects it.
    #[derive(Debug)]
    struct Blob;
    impl crate::val::ForeignValue for Blob {}

    let blob = Value::Foreign(std::sync::Arc::new(Blob));
    let consts = vec![blob.clone()];
    let code = assemble(&[
        encode::load(Index::Reg(9), Index::Const(0)).unwrap(),
        encode::load(Index::Stack(0), Index::Reg(9)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![Value::Int(0)]);
    th.run().unwrap();
    assert_eq!(th.at(Index::Reg(9)).unwrap(), blob);
    assert_eq!(th.at(Index::Stack(0)).unwrap(), blob);
}
