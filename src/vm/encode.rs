//! Assembler helpers: one encoder per instruction shape.
//!
//! Every encoder validates its operands against the exact field widths of
//! the target shape and refuses anything the decoder could not reproduce,
//! with distinct fault tags per operand kind. Encode and decode are
//! mutual inverses over the accepted domain.

use crate::val::RoundingMode;

use super::fault::Fault;
use super::index::Index;
use super::instr::{
    Instruction, BIN_ARGA_SHIFT, BIN_ARGA_STACK, BIN_ARGB_CONST, BIN_ARGB_SHIFT, BIN_ARGB_STACK,
    BIN_OUT_SHIFT, BIN_OUT_STACK, EXT_BIT, JUMP_LITERAL, JUMP_OFFSET_SHIFT, JUMP_SRC_CONST,
    JUMP_SRC_SHIFT, JUMP_SRC_STACK, LOAD_DST_SHIFT, LOAD_DST_STACK, LOAD_SRC_CONST,
    LOAD_SRC_SHIFT, LOAD_SRC_STACK, OPCODE_SHIFT, RANGE_COUNT_SHIFT, RANGE_SRC_CONST,
    RANGE_SRC_SHIFT, RANGE_SRC_STACK, RESERVE_SRC_CONST, RESERVE_SRC_SHIFT, RESERVE_SRC_STACK,
    TEST_ARGA_CONST, TEST_ARGA_SHIFT, TEST_ARGA_STACK, TEST_ARGB_CONST, TEST_ARGB_SHIFT,
    TEST_ARGB_STACK, TEST_CMP_SHIFT, TEST_WANT, XLOAD_DST_SHIFT, XLOAD_DST_STACK,
    XLOAD_SRC_CONST, XLOAD_SRC_STACK,
};
use super::opcode::{Cmp, Opcode};

fn reg_field(r: u16, bits: u32) -> Result<u32, Fault> {
    if (r as u32) >= (1u32 << bits) {
        return Err(Fault::InvalidRegister(r));
    }
    Ok(r as u32)
}

fn stack_field(s: i32, bits: u32) -> Result<u32, Fault> {
    let min = -(1i32 << (bits - 1));
    let max = (1i32 << (bits - 1)) - 1;
    if s < min || s > max {
        return Err(Fault::InvalidStackIndex(s as i64));
    }
    Ok((s as u32) & ((1u32 << bits) - 1))
}

fn const_field(k: u32, bits: u32) -> Result<u32, Fault> {
    if bits < 32 && k >= (1u32 << bits) {
        return Err(Fault::InvalidConstIndex(k));
    }
    Ok(k)
}

fn bin_out(out: Index) -> Result<u32, Fault> {
    Ok(match out {
        Index::Reg(r) => reg_field(r, 6)? << BIN_OUT_SHIFT,
        Index::Stack(s) => stack_field(s, 6)? << BIN_OUT_SHIFT | BIN_OUT_STACK,
        Index::Const(k) => return Err(Fault::ConstStore(k)),
    })
}

fn bin_arg_a(arg: Index) -> Result<u32, Fault> {
    Ok(match arg {
        Index::Reg(r) => reg_field(r, 6)? << BIN_ARGA_SHIFT,
        Index::Stack(s) => stack_field(s, 6)? << BIN_ARGA_SHIFT | BIN_ARGA_STACK,
        Index::Const(k) => return Err(Fault::InvalidConstIndex(k)),
    })
}

fn bin_arg_b(arg: Index) -> Result<u32, Fault> {
    Ok(match arg {
        Index::Reg(r) => reg_field(r, 6)? << BIN_ARGB_SHIFT,
        Index::Stack(s) => stack_field(s, 10)? << BIN_ARGB_SHIFT | BIN_ARGB_STACK,
        Index::Const(k) => const_field(k, 11)? << BIN_ARGB_SHIFT | BIN_ARGB_CONST,
    })
}

/// `out = argA op argB`. ArgA may be a register or stack slot; argB may
/// additionally be a constant.
pub fn binary(op: Opcode, out: Index, arg_a: Index, arg_b: Index) -> Result<Instruction, Fault> {
    if !op.is_binary() {
        return Err(Fault::InvalidOpcode(op as u32));
    }
    let w = (op as u32) << OPCODE_SHIFT | bin_out(out)? | bin_arg_a(arg_a)? | bin_arg_b(arg_b)?;
    Ok(Instruction::new(w))
}

/// `out = op argA` (neg, not).
pub fn unary(op: Opcode, out: Index, arg_a: Index) -> Result<Instruction, Fault> {
    if !matches!(op, Opcode::Neg | Opcode::Not) {
        return Err(Fault::InvalidOpcode(op as u32));
    }
    let w = (op as u32) << OPCODE_SHIFT | bin_out(out)? | bin_arg_a(arg_a)?;
    Ok(Instruction::new(w))
}

/// `out = round(src)` with the mode packed into the argA field.
pub fn round(out: Index, mode: RoundingMode, src: Index) -> Result<Instruction, Fault> {
    let w = (Opcode::Round as u32) << OPCODE_SHIFT
        | (mode as u32) << BIN_ARGA_SHIFT
        | bin_out(out)?
        | bin_arg_b(src)?;
    Ok(Instruction::new(w))
}

fn test_arg(arg: Index, shift: u32, const_flag: u32, stack_flag: u32) -> Result<u32, Fault> {
    Ok(match arg {
        Index::Reg(r) => reg_field(r, 6)? << shift,
        Index::Stack(s) => stack_field(s, 9)? << shift | stack_flag,
        Index::Const(k) => const_field(k, 10)? << shift | const_flag,
    })
}

/// Fused comparison: skips the following instruction unless the
/// comparator's result equals `want`, in which case a following `jump`
/// executes immediately.
pub fn test(cmp: Cmp, want: bool, arg_a: Index, arg_b: Index) -> Result<Instruction, Fault> {
    let mut w = (Opcode::Test as u32) << OPCODE_SHIFT | (cmp as u32) << TEST_CMP_SHIFT;
    if want {
        w |= TEST_WANT;
    }
    w |= test_arg(arg_a, TEST_ARGA_SHIFT, TEST_ARGA_CONST, TEST_ARGA_STACK)?;
    w |= test_arg(arg_b, TEST_ARGB_SHIFT, TEST_ARGB_CONST, TEST_ARGB_STACK)?;
    Ok(Instruction::new(w))
}

/// Literal jump: a signed 25-bit offset added to PC.
pub fn jump(offset: i32) -> Result<Instruction, Fault> {
    const MIN: i32 = -(1 << 24);
    const MAX: i32 = (1 << 24) - 1;
    if offset < MIN || offset > MAX {
        return Err(Fault::PcRange(offset as i64));
    }
    let w = (Opcode::Jump as u32) << OPCODE_SHIFT
        | JUMP_LITERAL
        | ((offset as u32) & 0x01FF_FFFF) << JUMP_OFFSET_SHIFT;
    Ok(Instruction::new(w))
}

/// Indexed jump: the loaded integer value is added to PC.
pub fn jump_indexed(target: Index) -> Result<Instruction, Fault> {
    let mut w = (Opcode::Jump as u32) << OPCODE_SHIFT;
    w |= match target {
        Index::Reg(r) => reg_field(r, 6)? << JUMP_SRC_SHIFT,
        Index::Stack(s) => stack_field(s, 23)? << JUMP_SRC_SHIFT | JUMP_SRC_STACK,
        Index::Const(k) => const_field(k, 23)? << JUMP_SRC_SHIFT | JUMP_SRC_CONST,
    };
    Ok(Instruction::new(w))
}

fn range_instr(
    op: Opcode,
    count: u32,
    target: Index,
    allow_const: bool,
) -> Result<Instruction, Fault> {
    if count == 0 || count > 64 {
        return Err(Fault::InvalidRange(count));
    }
    let mut w = (op as u32) << OPCODE_SHIFT | (count - 1) << RANGE_COUNT_SHIFT;
    w |= match target {
        Index::Reg(r) => reg_field(r, 6)? << RANGE_SRC_SHIFT,
        Index::Stack(s) => stack_field(s, 18)? << RANGE_SRC_SHIFT | RANGE_SRC_STACK,
        Index::Const(k) if allow_const => const_field(k, 18)? << RANGE_SRC_SHIFT | RANGE_SRC_CONST,
        Index::Const(k) => return Err(Fault::ConstStore(k)),
    };
    Ok(Instruction::new(w))
}

/// Pushes `count` successive slots starting at `src`.
pub fn push(count: u32, src: Index) -> Result<Instruction, Fault> {
    range_instr(Opcode::Push, count, src, true)
}

/// Pops `count` slots back through `dst`; constants are not a legal
/// target.
pub fn pop(count: u32, dst: Index) -> Result<Instruction, Fault> {
    range_instr(Opcode::Pop, count, dst, false)
}

/// Grows stack capacity by the integer value loaded through `src`.
pub fn reserve(src: Index) -> Result<Instruction, Fault> {
    let mut w = (Opcode::Reserve as u32) << OPCODE_SHIFT;
    w |= match src {
        Index::Reg(r) => reg_field(r, 6)? << RESERVE_SRC_SHIFT,
        Index::Stack(s) => stack_field(s, 24)? << RESERVE_SRC_SHIFT | RESERVE_SRC_STACK,
        Index::Const(k) => const_field(k, 24)? << RESERVE_SRC_SHIFT | RESERVE_SRC_CONST,
    };
    Ok(Instruction::new(w))
}

/// Copies `src` to `dst` with no coercion; base 32-bit form.
pub fn load(dst: Index, src: Index) -> Result<Instruction, Fault> {
    let mut w = (Opcode::Load as u32) << OPCODE_SHIFT;
    w |= match dst {
        Index::Reg(r) => reg_field(r, 7)? << LOAD_DST_SHIFT,
        Index::Stack(s) => stack_field(s, 7)? << LOAD_DST_SHIFT | LOAD_DST_STACK,
        Index::Const(k) => return Err(Fault::ConstStore(k)),
    };
    w |= match src {
        Index::Reg(r) => reg_field(r, 6)? << LOAD_SRC_SHIFT,
        Index::Stack(s) => stack_field(s, 16)? << LOAD_SRC_SHIFT | LOAD_SRC_STACK,
        Index::Const(k) => const_field(k, 16)? << LOAD_SRC_SHIFT | LOAD_SRC_CONST,
    };
    Ok(Instruction::new(w))
}

/// Extended (64-bit) load reaching 16-bit destinations and 32-bit
/// sources. The only instruction that sets the extension bit.
pub fn load_wide(dst: Index, src: Index) -> Result<Instruction, Fault> {
    let mut w = EXT_BIT | (Opcode::Load as u32) << OPCODE_SHIFT;
    w |= match dst {
        Index::Reg(r) => reg_field(r, 16)? << XLOAD_DST_SHIFT,
        Index::Stack(s) => stack_field(s, 16)? << XLOAD_DST_SHIFT | XLOAD_DST_STACK,
        Index::Const(k) => return Err(Fault::ConstStore(k)),
    };
    let ext = match src {
        Index::Reg(r) => r as u32,
        Index::Stack(s) => {
            w |= XLOAD_SRC_STACK;
            s as u32
        }
        Index::Const(k) => {
            w |= XLOAD_SRC_CONST;
            k
        }
    };
    Ok(Instruction::wide(w, ext))
}
