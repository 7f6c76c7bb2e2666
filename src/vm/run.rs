//! The execution engine: fetch/decode/dispatch loop, the fixed handler
//! table, and the per-opcode handlers including the fused test+jump.

use anyhow::Context;
use tracing::trace;

use crate::val::{self, RoundingMode, Value};

use super::fault::Fault;
use super::index::Index;
use super::instr::Instruction;
use super::opcode::{Cmp, Opcode, OPCODE_SPACE};
use super::thread::Thread;

type OpFn = fn(Instruction, &mut Thread) -> Result<(), Fault>;

/// Fixed-size dispatch table indexed by the primary opcode. Empty slots
/// surface as `InvalidOpcode`.
const OP_TABLE: [Option<OpFn>; OPCODE_SPACE] = build_table();

const fn build_table() -> [Option<OpFn>; OPCODE_SPACE] {
    let mut table: [Option<OpFn>; OPCODE_SPACE] = [None; OPCODE_SPACE];
    table[Opcode::Add as usize] = Some(op_add);
    table[Opcode::Sub as usize] = Some(op_sub);
    table[Opcode::Div as usize] = Some(op_div);
    table[Opcode::Mul as usize] = Some(op_mul);
    table[Opcode::Pow as usize] = Some(op_pow);
    table[Opcode::Mod as usize] = Some(op_mod);
    table[Opcode::Neg as usize] = Some(op_neg);
    table[Opcode::Not as usize] = Some(op_not);
    table[Opcode::Or as usize] = Some(op_or);
    table[Opcode::And as usize] = Some(op_and);
    table[Opcode::Xor as usize] = Some(op_xor);
    table[Opcode::AShift as usize] = Some(op_ashift);
    table[Opcode::BShift as usize] = Some(op_bshift);
    table[Opcode::Round as usize] = Some(op_round);
    table[Opcode::Test as usize] = Some(op_test);
    table[Opcode::Jump as usize] = Some(op_jump);
    table[Opcode::Push as usize] = Some(op_push);
    table[Opcode::Pop as usize] = Some(op_pop);
    table[Opcode::Reserve as usize] = Some(op_reserve);
    table[Opcode::Load as usize] = Some(op_load);
    table[Opcode::Call as usize] = Some(op_unimplemented);
    table[Opcode::Return as usize] = Some(op_unimplemented);
    table[Opcode::Defer as usize] = Some(op_unimplemented);
    table[Opcode::Fork as usize] = Some(op_unimplemented);
    table[Opcode::Join as usize] = Some(op_unimplemented);
    table
}

impl Thread {
    /// Drives the current frame until the PC leaves `[0, code.len())`.
    /// Faults propagate out unchanged.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.pc >= 0 && (self.pc as usize) < self.func.code.len() {
            let Some(instr) = Instruction::fetch(&self.func.code, self.pc as usize) else {
                break;
            };
            self.pc += instr.words() as i64;
            dispatch(instr, self)?;
        }
        Ok(())
    }

    /// Runs behind a fault barrier: any fatal condition comes back as a
    /// typed runtime error carrying the faulting PC, with the original
    /// `Fault` kind reachable through `downcast_ref`.
    pub fn run_protected(&mut self) -> anyhow::Result<()> {
        let result = self.run();
        let pc = self.pc;
        result.with_context(|| format!("runtime panic at pc {pc}"))
    }
}

fn dispatch(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let raw = instr.opcode_raw();
    let handler = OP_TABLE
        .get(raw as usize)
        .copied()
        .flatten()
        .ok_or(Fault::InvalidOpcode(raw))?;
    trace!(pc = th.pc, instr = %instr, "dispatch");
    handler(instr, th)
}

fn op_add(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.add(rhs).into())
}

fn op_sub(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.sub(rhs).into())
}

fn op_div(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.div(rhs)?.into())
}

fn op_mul(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.mul(rhs).into())
}

fn op_pow(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.pow(rhs).into())
}

fn op_mod(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_num(&th.load(instr.arg_a())?)?;
    let rhs = val::to_num(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.rem(rhs)?.into())
}

fn op_neg(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let recv = val::to_num(&th.load(instr.arg_a())?)?;
    th.store(instr.out(), recv.neg().into())
}

fn op_not(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let recv = val::to_bits(&th.load(instr.arg_a())?)?;
    th.store(instr.out(), recv.not().into())
}

fn op_or(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_bits(&th.load(instr.arg_a())?)?;
    let rhs = val::to_bits(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.or(rhs).into())
}

fn op_and(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_bits(&th.load(instr.arg_a())?)?;
    let rhs = val::to_bits(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.and(rhs).into())
}

fn op_xor(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = val::to_bits(&th.load(instr.arg_a())?)?;
    let rhs = val::to_bits(&th.load(instr.arg_b())?)?;
    th.store(instr.out(), lhs.xor(rhs).into())
}

fn op_ashift(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = th.load(instr.arg_a())?;
    let rhs = th.load(instr.arg_b())?;
    th.store(instr.out(), val::arith_shift(&lhs, &rhs)?)
}

fn op_bshift(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let lhs = th.load(instr.arg_a())?;
    let rhs = th.load(instr.arg_b())?;
    th.store(instr.out(), val::bit_shift(&lhs, &rhs)?)
}

fn op_round(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let mode = RoundingMode::from_raw(instr.arg_a_raw())?;
    let v = th.load(instr.arg_b())?;
    th.store(instr.out(), val::round(&v, mode)?)
}

/// Evaluates a `test` and fuses with a directly following `jump`: on
/// mismatch the next instruction is skipped, on match a following jump
/// executes as part of the same observable step.
fn op_test(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let a = th.load(instr.test_a())?;
    let b = th.load(instr.test_b())?;
    let take = evaluate(instr.cmp(), instr.want(), &a, &b)?;

    // PC already points at the instruction after the test.
    let next = Instruction::fetch(th.code(), th.pc as usize);
    if !take {
        if let Some(next) = next {
            th.pc += next.words() as i64;
        }
        return Ok(());
    }
    if let Some(next) = next {
        if matches!(next.opcode(), Ok(Opcode::Jump)) {
            th.pc += next.words() as i64;
            return op_jump(next, th);
        }
    }
    Ok(())
}

fn evaluate(cmp: Cmp, want: bool, a: &Value, b: &Value) -> Result<bool, Fault> {
    Ok(match cmp {
        Cmp::Lt => val::less_than(a, b)? == want,
        Cmp::Le => val::less_equal(a, b)? == want,
        Cmp::Eq => val::equal(a, b)? == want,
        Cmp::Ne => val::equal(a, b)? != want,
        Cmp::Gt => val::less_equal(a, b)? != want,
        Cmp::Ge => val::less_than(a, b)? != want,
        Cmp::Includes | Cmp::Excludes => return Err(Fault::InvalidComparator(cmp)),
    })
}

fn op_jump(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    match instr.jump_literal() {
        Some(offset) => th.pc += offset as i64,
        None => {
            let v = th.load(instr.jump_target())?;
            th.pc += val::to_int(&v)?;
        }
    }
    Ok(())
}

fn op_push(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let count = instr.range_count();
    match instr.range_target() {
        Index::Reg(r) => {
            for i in 0..count {
                let v = th.load(Index::Reg(r + i as u16))?;
                th.push(v);
            }
        }
        Index::Const(k) => {
            for i in 0..count {
                let v = th.load(Index::Const(k + i))?;
                th.push(v);
            }
        }
        Index::Stack(s) => {
            // Resolve once against the stack as it was when the
            // instruction started; the pushes themselves move the top.
            let base = th.resolve_stack(s)?;
            for i in 0..count as usize {
                let at = if s >= 0 {
                    base.checked_add(i)
                } else {
                    base.checked_sub(i)
                }
                .ok_or(Fault::InvalidStackIndex(s as i64))?;
                let v = th
                    .stack
                    .get(at)
                    .cloned()
                    .ok_or(Fault::InvalidStackIndex(s as i64))?;
                th.push(v);
            }
        }
    }
    Ok(())
}

fn op_pop(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let count = instr.range_count() as usize;
    let mut popped = Vec::with_capacity(count);
    for _ in 0..count {
        popped.push(th.pop()?);
    }
    // popped[0] is the old top; it lands farthest from the target, so
    // pop exactly inverts push.
    match instr.range_target() {
        Index::Reg(r) => {
            for (i, v) in popped.into_iter().enumerate() {
                th.store(Index::Reg(r + (count - 1 - i) as u16), v)?;
            }
        }
        Index::Stack(s) => {
            for (i, v) in popped.into_iter().enumerate() {
                let offset = (count - 1 - i) as i32;
                let slot = if s >= 0 { s + offset } else { s - offset };
                th.store(Index::Stack(slot), v)?;
            }
        }
        Index::Const(k) => return Err(Fault::ConstStore(k)),
    }
    Ok(())
}

fn op_reserve(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let v = th.load(instr.reserve_src())?;
    th.grow_stack(val::to_int(&v)?);
    Ok(())
}

fn op_load(instr: Instruction, th: &mut Thread) -> Result<(), Fault> {
    let v = th.load(instr.load_src())?;
    th.store(instr.load_dst(), v)
}

fn op_unimplemented(instr: Instruction, _th: &mut Thread) -> Result<(), Fault> {
    Err(Fault::UnimplementedOpcode(instr.opcode()?))
}
