use crate::val::RoundingMode;
use crate::vm::disasm;

use super::*;

#[test]
fn canonical_render_vectors() {
    let cases: [(Instruction, &str); 7] = [
        (
            encode::test(Cmp::Lt, true, Index::Reg(5), Index::Const(1023)).unwrap(),
            "test (r5 < const[1023]) == true",
        ),
        (
            encode::load(Index::Stack(-64), Index::Const(65535)).unwrap(),
            "load stack[-64] const[65535]",
        ),
        (
            encode::load_wide(Index::Stack(-32768), Index::Const(4294967295)).unwrap(),
            "xload stack[-32768] const[4294967295]",
        ),
        (encode::jump(-16777216).unwrap(), "jump -16777216"),
        (encode::jump_indexed(Index::Reg(0)).unwrap(), "jump %pc"),
        (
            encode::push(64, Index::Const(262143)).unwrap(),
            "push 64 const[262143]",
        ),
        (
            encode::binary(
                Opcode::Add,
                Index::Stack(-32),
                Index::Stack(-32),
                Index::Stack(-512),
            )
            .unwrap(),
            "add stack[-32] stack[-32] stack[-512]",
        ),
    ];
    for (instr, want) in cases {
        assert_eq!(instr.to_string(), want);
    }
}

#[test]
fn secondary_render_forms() {
    let neg = encode::unary(Opcode::Neg, Index::Reg(4), Index::Reg(5)).unwrap();
    assert_eq!(neg.to_string(), "neg r4 r5");

    let not = encode::unary(Opcode::Not, Index::Stack(-1), Index::Reg(63)).unwrap();
    assert_eq!(not.to_string(), "not stack[-1] r63");

    let round = encode::round(Index::Reg(4), RoundingMode::Nearest, Index::Const(2)).unwrap();
    assert_eq!(round.to_string(), "round r4 nearest const[2]");

    let pop = encode::pop(2, Index::Reg(8)).unwrap();
    assert_eq!(pop.to_string(), "pop 2 r8");

    let reserve = encode::reserve(Index::Const(16)).unwrap();
    assert_eq!(reserve.to_string(), "reserve const[16]");

    // Aliased registers render by name in every operand position.
    let esp = encode::binary(Opcode::Add, Index::Reg(2), Index::Reg(2), Index::Const(3)).unwrap();
    assert_eq!(esp.to_string(), "add %esp %esp const[3]");
}

#[test]
fn binary_round_trips_over_field_boundaries() {
    let outs = [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-32),
        Index::Stack(0),
        Index::Stack(31),
    ];
    let args_b = [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-512),
        Index::Stack(-1),
        Index::Stack(511),
        Index::Const(0),
        Index::Const(2047),
    ];
    for out in outs {
        for arg_a in outs {
            for arg_b in args_b {
                let instr = encode::binary(Opcode::Xor, out, arg_a, arg_b).unwrap();
                assert_eq!(instr.opcode(), Ok(Opcode::Xor));
                assert_eq!(instr.out(), out);
                assert_eq!(instr.arg_a(), arg_a);
                assert_eq!(instr.arg_b(), arg_b);
                assert_eq!(instr.words(), 1);
            }
        }
    }
}

#[test]
fn test_round_trips_over_field_boundaries() {
    let args = [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-256),
        Index::Stack(-1),
        Index::Stack(255),
        Index::Const(0),
        Index::Const(1023),
    ];
    for cmp in [Cmp::Lt, Cmp::Le, Cmp::Eq, Cmp::Ne, Cmp::Gt, Cmp::Ge, Cmp::Includes, Cmp::Excludes]
    {
        for want in [false, true] {
            for arg_a in args {
                for arg_b in args {
                    let instr = encode::test(cmp, want, arg_a, arg_b).unwrap();
                    assert_eq!(instr.opcode(), Ok(Opcode::Test));
                    assert_eq!(instr.cmp(), cmp);
                    assert_eq!(instr.want(), want);
                    assert_eq!(instr.test_a(), arg_a);
                    assert_eq!(instr.test_b(), arg_b);
                }
            }
        }
    }
}

#[test]
fn load_round_trips_over_field_boundaries() {
    let dsts = [
        Index::Reg(0),
        Index::Reg(127),
        Index::Stack(-64),
        Index::Stack(0),
        Index::Stack(63),
    ];
    let srcs = [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-32768),
        Index::Stack(-1),
        Index::Stack(32767),
        Index::Const(0),
        Index::Const(65535),
    ];
    for dst in dsts {
        for src in srcs {
            let instr = encode::load(dst, src).unwrap();
            assert_eq!(instr.opcode(), Ok(Opcode::Load));
            assert_eq!(instr.load_dst(), dst);
            assert_eq!(instr.load_src(), src);
            assert_eq!(instr.words(), 1);
        }
    }
}

#[test]
fn wide_load_round_trips_over_field_boundaries() {
    let dsts = [
        Index::Reg(0),
        Index::Reg(65535),
        Index::Stack(-32768),
        Index::Stack(0),
        Index::Stack(32767),
    ];
    let srcs = [
        Index::Reg(0),
        Index::Reg(65535),
        Index::Stack(i32::MIN),
        Index::Stack(-1),
        Index::Stack(i32::MAX),
        Index::Const(0),
        Index::Const(u32::MAX),
    ];
    for dst in dsts {
        for src in srcs {
            let instr = encode::load_wide(dst, src).unwrap();
            assert_eq!(instr.opcode(), Ok(Opcode::Load));
            assert!(instr.is_wide());
            assert_eq!(instr.words(), 2);
            assert_eq!(instr.load_dst(), dst);
            assert_eq!(instr.load_src(), src);
        }
    }
}

#[test]
fn wide_load_survives_a_code_stream_round_trip() {
    let instr = encode::load_wide(Index::Reg(300), Index::Const(70000)).unwrap();
    let code = assemble(&[instr]);
    assert_eq!(code.len(), 2);
    let back = Instruction::fetch(&code, 0).unwrap();
    assert_eq!(back, instr);
    assert_eq!(back.load_dst(), Index::Reg(300));
    assert_eq!(back.load_src(), Index::Const(70000));
}

#[test]
fn jump_round_trips_over_field_boundaries() {
    for offset in [-(1 << 24), -1, 0, 1, (1 << 24) - 1] {
        let instr = encode::jump(offset).unwrap();
        assert_eq!(instr.opcode(), Ok(Opcode::Jump));
        assert_eq!(instr.jump_literal(), Some(offset));
    }
    for target in [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-4194304),
        Index::Stack(4194303),
        Index::Const(0),
        Index::Const(8388607),
    ] {
        let instr = encode::jump_indexed(target).unwrap();
        assert_eq!(instr.jump_literal(), None);
        assert_eq!(instr.jump_target(), target);
    }
}

#[test]
fn push_pop_round_trips_over_field_boundaries() {
    let targets = [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-131072),
        Index::Stack(131071),
        Index::Const(0),
        Index::Const(262143),
    ];
    for count in [1, 2, 64] {
        for target in targets {
            let instr = encode::push(count, target).unwrap();
            assert_eq!(instr.opcode(), Ok(Opcode::Push));
            assert_eq!(instr.range_count(), count);
            assert_eq!(instr.range_target(), target);
        }
    }
    let instr = encode::pop(64, Index::Stack(-131072)).unwrap();
    assert_eq!(instr.opcode(), Ok(Opcode::Pop));
    assert_eq!(instr.range_count(), 64);
    assert_eq!(instr.range_target(), Index::Stack(-131072));
}

#[test]
fn reserve_round_trips_over_field_boundaries() {
    for src in [
        Index::Reg(0),
        Index::Reg(63),
        Index::Stack(-(1 << 23)),
        Index::Stack((1 << 23) - 1),
        Index::Const(0),
        Index::Const((1 << 24) - 1),
    ] {
        let instr = encode::reserve(src).unwrap();
        assert_eq!(instr.opcode(), Ok(Opcode::Reserve));
        assert_eq!(instr.reserve_src(), src);
    }
}

#[test]
fn encoders_reject_what_the_decoder_cannot_reproduce() {
    assert_eq!(
        encode::binary(Opcode::Add, Index::Reg(64), Index::Reg(0), Index::Reg(0)),
        Err(Fault::InvalidRegister(64))
    );
    assert_eq!(
        encode::binary(Opcode::Add, Index::Stack(32), Index::Reg(0), Index::Reg(0)),
        Err(Fault::InvalidStackIndex(32))
    );
    assert_eq!(
        encode::binary(Opcode::Add, Index::Reg(0), Index::Stack(-33), Index::Reg(0)),
        Err(Fault::InvalidStackIndex(-33))
    );
    assert_eq!(
        encode::binary(Opcode::Add, Index::Reg(0), Index::Reg(0), Index::Const(2048)),
        Err(Fault::InvalidConstIndex(2048))
    );
    assert_eq!(
        encode::binary(Opcode::Add, Index::Reg(0), Index::Reg(0), Index::Stack(-513)),
        Err(Fault::InvalidStackIndex(-513))
    );
    assert_eq!(
        encode::binary(Opcode::Add, Index::Const(0), Index::Reg(0), Index::Reg(0)),
        Err(Fault::ConstStore(0))
    );
    assert_eq!(
        encode::binary(Opcode::Jump, Index::Reg(0), Index::Reg(0), Index::Reg(0)),
        Err(Fault::InvalidOpcode(Opcode::Jump as u32))
    );
    assert_eq!(
        encode::test(Cmp::Lt, true, Index::Const(1024), Index::Reg(0)),
        Err(Fault::InvalidConstIndex(1024))
    );
    assert_eq!(
        encode::load(Index::Reg(128), Index::Reg(0)),
        Err(Fault::InvalidRegister(128))
    );
    assert_eq!(
        encode::load(Index::Reg(0), Index::Const(65536)),
        Err(Fault::InvalidConstIndex(65536))
    );
    assert_eq!(
        encode::load(Index::Const(0), Index::Reg(0)),
        Err(Fault::ConstStore(0))
    );
    assert_eq!(encode::jump(1 << 24), Err(Fault::PcRange(1 << 24)));
    assert_eq!(encode::push(0, Index::Reg(3)), Err(Fault::InvalidRange(0)));
    assert_eq!(encode::push(65, Index::Reg(3)), Err(Fault::InvalidRange(65)));
    assert_eq!(encode::pop(1, Index::Const(3)), Err(Fault::ConstStore(3)));
}

#[test]
fn unknown_opcode_words_decode_as_invalid() {
    let word = 29u32 << 1;
    let instr = Instruction::fetch(&[word], 0).unwrap();
    assert_eq!(instr.opcode(), Err(Fault::InvalidOpcode(29)));
    assert_eq!(instr.to_string(), "invalid(29)");
}

#[test]
fn reserved_frame_opcodes_render_bare() {
    let code = [
        (Opcode::Call as u32) << 1,
        (Opcode::Return as u32) << 1,
        (Opcode::Fork as u32) << 1,
    ];
    let listing = disasm(&code);
    assert_eq!(listing, "   0 call\n   1 return\n   2 fork\n");
}
