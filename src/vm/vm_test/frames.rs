use super::*;

#[test]
fn store_load_round_trip_through_every_index_shape() {
    let mut th = thread_with(vec![], vec![Value::Int(7)], vec![Value::Int(1), Value::Int(2)]);

    for (index, v) in [
        (Index::Reg(3), Value::Int(42)),
        (Index::Reg(63), Value::Float(1.5)),
        (Index::Stack(0), Value::Uint(9)),
        (Index::Stack(-1), Value::Int(-9)),
    ] {
        th.store(index, v.clone()).unwrap();
        assert_eq!(th.at(index).unwrap(), v);
    }

    // Constants read fine and refuse writes.
    assert_eq!(th.at(Index::Const(0)).unwrap(), Value::Int(7));
    assert_eq!(
        th.store(Index::Const(0), Value::Int(1)),
        Err(Fault::ConstStore(0))
    );
    assert_eq!(th.at(Index::Const(1)), Err(Fault::InvalidConstIndex(1)));

    // Aliased registers read as Int snapshots.
    assert_eq!(th.at(Index::Reg(0)).unwrap(), Value::Int(0));
    assert_eq!(th.at(Index::Reg(1)).unwrap(), Value::Int(0));
    assert_eq!(th.at(Index::Reg(2)).unwrap(), Value::Int(2));

    assert_eq!(th.at(Index::Reg(64)), Err(Fault::InvalidRegister(64)));
    assert_eq!(th.at(Index::Stack(5)), Err(Fault::InvalidStackIndex(5)));
    assert_eq!(th.at(Index::Stack(-3)), Err(Fault::InvalidStackIndex(-3)));
}

#[test]
fn ebp_is_read_only_from_bytecode() {
    let consts = vec![Value::Int(1)];
    let code = assemble(&[encode::load(Index::Reg(1), Index::Const(0)).unwrap()]);
    let mut th = thread_with(code, consts, vec![]);
    assert_eq!(th.run(), Err(Fault::EbpStore));
}

#[test]
fn esp_writes_resize_and_clear_the_tail() {
    let mut th = thread_with(
        vec![],
        vec![],
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
    );

    th.store(Index::Reg(2), Value::Int(2)).unwrap();
    assert_eq!(th.stack_len(), 2);

    // Regrowing re-exposes only neutral slots.
    th.store(Index::Reg(2), Value::Int(4)).unwrap();
    assert_eq!(th.stack_len(), 4);
    assert_eq!(th.at(Index::Stack(2)).unwrap(), Value::Empty);
    assert_eq!(th.at(Index::Stack(3)).unwrap(), Value::Empty);
    assert_eq!(th.at(Index::Stack(0)).unwrap(), Value::Int(1));

    assert_eq!(
        th.store(Index::Reg(2), Value::Int(-1)),
        Err(Fault::StackUnderflow)
    );
    assert_eq!(
        th.store(Index::Reg(2), Value::Float(2.0)),
        Err(Fault::TypeFault("Float"))
    );
}

#[test]
fn frame_push_pop_with_keep() {
    let mut th = Thread::new();
    for v in [Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)] {
        th.push(v);
    }

    th.push_frame(-2, Function::default()).unwrap();
    assert_eq!(th.ebp(), 2);
    assert_eq!(th.frame_depth(), 1);

    th.push(Value::Int(5));
    th.push(Value::Int(6));

    th.pop_frame(1).unwrap();
    assert_eq!(th.stack_len(), 3);
    assert_eq!(th.ebp(), 0);
    assert_eq!(th.frame_depth(), 0);
    // Exactly the old top survived, moved down to the callee's base.
    assert_eq!(th.at(Index::Stack(-1)).unwrap(), Value::Int(6));
    assert_eq!(th.at(Index::Stack(1)).unwrap(), Value::Int(2));

    // The dropped window was cleared before the stack shrank.
    th.store(Index::Reg(2), Value::Int(5)).unwrap();
    assert_eq!(th.at(Index::Stack(3)).unwrap(), Value::Empty);
    assert_eq!(th.at(Index::Stack(4)).unwrap(), Value::Empty);
}

#[test]
fn push_then_pop_frame_restores_the_thread() {
    let mut th = Thread::new();
    th.push(Value::Int(1));

    let callee = Function::new(3, vec![0; 5], vec![]);
    th.push_frame(0, callee).unwrap();
    assert_eq!(th.pc(), 3);
    assert_eq!(th.ebp(), 1);
    assert_eq!(th.frame_depth(), 1);

    th.pop_frame(0).unwrap();
    assert_eq!(th.pc(), 0);
    assert_eq!(th.ebp(), 0);
    assert_eq!(th.frame_depth(), 0);
    assert_eq!(th.stack_len(), 1);
}

#[test]
fn frame_guards() {
    let mut th = Thread::new();
    assert_eq!(th.pop_frame(0), Err(Fault::StackUnderflow));
    assert!(matches!(
        th.push_frame(1, Function::default()),
        Err(Fault::InvalidStackIndex(_))
    ));
    // Carving more slots than the stack holds underflows.
    assert_eq!(
        th.push_frame(-1, Function::default()),
        Err(Fault::StackUnderflow)
    );

    th.push(Value::Int(1));
    th.push_frame(0, Function::default()).unwrap();
    // More slots to keep than the frame window holds.
    assert_eq!(th.pop_frame(2), Err(Fault::StackUnderflow));
}

#[test]
fn replace_frame_keeps_the_chain_depth() {
    let mut th = Thread::new();
    th.push(Value::Int(1));
    th.push_frame(0, Function::default()).unwrap();
    th.push(Value::Int(2));
    th.push(Value::Int(3));

    let next = Function::new(2, vec![0; 4], vec![]);
    th.replace_frame(1, next).unwrap();
    assert_eq!(th.frame_depth(), 1);
    assert_eq!(th.ebp(), 1);
    assert_eq!(th.pc(), 2);
    assert_eq!(th.stack_len(), 2);
    assert_eq!(th.at(Index::Stack(0)).unwrap(), Value::Int(3));
}

#[test]
fn push_pop_ranges_invert_each_other() {
    let consts = vec![Value::Int(10), Value::Int(20), Value::Int(30)];
    let code = assemble(&[
        encode::load(Index::Reg(4), Index::Const(0)).unwrap(),
        encode::load(Index::Reg(5), Index::Const(1)).unwrap(),
        encode::load(Index::Reg(6), Index::Const(2)).unwrap(),
        encode::push(3, Index::Reg(4)).unwrap(),
        encode::pop(3, Index::Reg(8)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();

    assert_eq!(th.stack_len(), 0);
    assert_eq!(th.at(Index::Reg(8)).unwrap(), Value::Int(10));
    assert_eq!(th.at(Index::Reg(9)).unwrap(), Value::Int(20));
    assert_eq!(th.at(Index::Reg(10)).unwrap(), Value::Int(30));
}

#[test]
fn stack_sourced_push_walks_outward() {
    let code = assemble(&[encode::push(2, Index::Stack(-1)).unwrap()]);
    let mut th = thread_with(
        code,
        vec![],
        vec![Value::Int(10), Value::Int(20), Value::Int(30)],
    );
    th.run().unwrap();

    assert_eq!(th.stack_len(), 5);
    assert_eq!(th.at(Index::Stack(3)).unwrap(), Value::Int(30));
    assert_eq!(th.at(Index::Stack(4)).unwrap(), Value::Int(20));
}

#[test]
fn stack_sourced_push_and_pop_are_symmetric() {
    let code = assemble(&[
        encode::push(3, Index::Stack(-1)).unwrap(),
        encode::pop(3, Index::Stack(-1)).unwrap(),
    ]);
    let stack = vec![Value::Int(10), Value::Int(20), Value::Int(30)];
    let mut th = thread_with(code, vec![], stack.clone());
    th.run().unwrap();

    assert_eq!(th.stack_len(), 3);
    for (i, v) in stack.iter().enumerate() {
        assert_eq!(th.at(Index::Stack(i as i32)).unwrap(), *v);
    }
}

#[test]
fn multi_slot_push_from_constants() {
    let consts = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
    let code = assemble(&[encode::push(3, Index::Const(0)).unwrap()]);
    let mut th = thread_with(code, consts, vec![]);
    th.run().unwrap();
    assert_eq!(th.stack_len(), 3);
    assert_eq!(th.at(Index::Stack(-1)).unwrap(), Value::Int(3));
}

#[test]
fn popping_an_empty_stack_underflows() {
    let code = assemble(&[encode::pop(1, Index::Reg(3)).unwrap()]);
    let mut th = thread_with(code, vec![], vec![]);
    assert_eq!(th.run(), Err(Fault::StackUnderflow));
    assert_eq!(Thread::new().pop(), Err(Fault::StackUnderflow));
}

#[test]
fn reserve_keeps_the_stack_length() {
    let consts = vec![Value::Float(4.0)];
    let code = assemble(&[encode::reserve(Index::Const(0)).unwrap()]);
    let mut th = thread_with(code, consts, vec![Value::Int(1)]);
    th.run().unwrap();
    assert_eq!(th.stack_len(), 1);
}

#[test]
fn protected_run_preserves_the_fault_kind() {
    let consts = vec![Value::Int(1), Value::Int(0)];
    let code = assemble(&[
        encode::load(Index::Reg(4), Index::Const(0)).unwrap(),
        encode::binary(Opcode::Div, Index::Reg(3), Index::Reg(4), Index::Const(1)).unwrap(),
    ]);
    let mut th = thread_with(code, consts, vec![]);

    let err = th.run_protected().unwrap_err();
    assert_eq!(err.downcast_ref::<Fault>(), Some(&Fault::DivisionByZero));
    assert!(err.to_string().contains("runtime panic at pc"));
}
