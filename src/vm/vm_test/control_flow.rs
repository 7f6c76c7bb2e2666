use super::*;

fn fused_program(want: bool) -> (Vec<u32>, Vec<Value>) {
    // r5 = 10, r10 = 0; (r5 < 1) is false, so the jump arms only when
    // `want` agrees. The two trailing adds are the probe.
    let consts = vec![Value::Int(1), Value::Int(10), Value::Int(0)];
    let code = assemble(&[
        encode::load(Index::Reg(5), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(10), Index::Const(2)).unwrap(),
        encode::test(Cmp::Lt, want, Index::Reg(5), Index::Const(0)).unwrap(),
        encode::jump(2).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(10), Index::Reg(10), Index::Const(0)).unwrap(),
        encode::binary(Opcode::Add, Index::Reg(10), Index::Reg(10), Index::Const(0)).unwrap(),
    ]);
    (code, consts)
}

#[test]
fn fused_test_jump_taken() {
    let (code, consts) = fused_program(false);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();

    // test at word 2: + test size + jump size + jump offset = 6.
    assert_eq!(th.at(Index::Reg(0)).unwrap(), Value::Int(6));
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Int(0));
}

#[test]
fn fused_test_jump_skipped_on_mismatch() {
    let (code, consts) = fused_program(true);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();

    // The jump is stepped over without executing; both probes run.
    assert_eq!(th.at(Index::Reg(0)).unwrap(), Value::Int(6));
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Int(2));
}

#[test]
fn matching_test_without_a_jump_falls_through() {
    let consts = vec![Value::Int(1), Value::Int(10)];
    let code = assemble(&[
        encode::load(Index::Reg(5), Index::Const(1)).unwrap(),
        encode::test(Cmp::Gt, true, Index::Reg(5), Index::Const(0)).unwrap(),
        encode::load(Index::Reg(10), Index::Const(0)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Int(1));
}

#[test]
fn comparator_table_inversions() {
    let consts = vec![Value::Int(3), Value::Int(3)];
    // (3 != 3) == true fails, skipping the store; the trailing store
    // after an agreeing (3 >= 3) == true runs.
    let code = assemble(&[
        encode::test(Cmp::Ne, true, Index::Const(0), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(10), Index::Const(0)).unwrap(),
        encode::test(Cmp::Ge, true, Index::Const(0), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(11), Index::Const(0)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Empty);
    assert_eq!(th.at(Index::Reg(11)).unwrap(), Value::Int(3));
}

#[test]
fn reserved_comparators_fault() {
    let consts = vec![Value::Int(1)];
    let code = assemble(&[
        encode::test(Cmp::Includes, true, Index::Const(0), Index::Const(0)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::InvalidComparator(Cmp::Includes)));
}

#[test]
fn indexed_jump_adds_the_loaded_value() {
    let consts = vec![Value::Int(2), Value::Int(7)];
    let code = assemble(&[
        encode::load(Index::Reg(3), Index::Const(0)).unwrap(),
        encode::jump_indexed(Index::Reg(3)).unwrap(),
        encode::load(Index::Reg(10), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(11), Index::Const(1)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Empty);
    assert_eq!(th.at(Index::Reg(11)).unwrap(), Value::Empty);
    assert_eq!(th.pc(), 4);
}

#[test]
fn leaving_the_code_range_terminates_the_loop() {
    let code = assemble(&[encode::jump(-5).unwrap()]);
    let mut th = thread_with(code, vec![], vec![]);
    th.run().unwrap();
    assert_eq!(th.pc(), -4);
}

#[test]
fn pc_writes_validate_range_and_type() {
    let consts = vec![Value::Int(99)];
    let code = assemble(&[encode::load(Index::Reg(0), Index::Const(0)).unwrap()]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::PcRange(99)));

    let consts = vec![Value::Float(1.0)];
    let code = assemble(&[encode::load(Index::Reg(0), Index::Const(0)).unwrap()]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::InvalidPcStore("Float")));

    // Storing exactly code.len() is the in-band way to halt.
    let consts = vec![Value::Int(3)];
    let code = assemble(&[
        encode::load(Index::Reg(0), Index::Const(0)).unwrap(),
        encode::load(Index::Reg(10), Index::Const(0)).unwrap(),
        encode::load(Index::Reg(11), Index::Const(0)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Empty);
    assert_eq!(th.pc(), 3);
}

#[test]
fn unknown_opcodes_fault_at_dispatch() {
    let code = vec![29u32 << 1];
    let mut th = thread_with(code, vec![], vec![]);
    assert_eq!(th.run(), Err(Fault::InvalidOpcode(29)));
}

#[test]
fn reserved_frame_opcodes_fault_at_dispatch() {
    let code = vec![(Opcode::Call as u32) << 1];
    let mut th = thread_with(code, vec![], vec![]);
    assert_eq!(th.run(), Err(Fault::UnimplementedOpcode(Opcode::Call)));
}
