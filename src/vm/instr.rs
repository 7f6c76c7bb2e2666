//! Instruction words and their bit-exact decoding.
//!
//! The base word is 32 bits, low bit first:
//!
//! | bits  | meaning                                             |
//! |-------|-----------------------------------------------------|
//! | 0     | extension bit: a second word follows                |
//! | 1..=5 | primary opcode (1..=12 when the extension bit set)  |
//! | 6..   | operands, opcode-dependent                          |
//!
//! Stack-offset fields are sign-extended with arithmetic shifts. Where a
//! constant payload overlaps a stack flag bit, the constant flag is
//! tested first; the two flags are mutually exclusive at encode time.

use std::fmt::{self, Write as _};

use crate::val::RoundingMode;

use super::fault::Fault;
use super::index::Index;
use super::opcode::{Cmp, Opcode};

pub(crate) const EXT_BIT: u32 = 1;
pub(crate) const OPCODE_SHIFT: u32 = 1;

// Binary shape: out | argA | argB. The 11-bit argB field doubles as a
// signed 10-bit stack offset (flag in bit 31) or a 6-bit register.
pub(crate) const BIN_OUT_STACK: u32 = 1 << 6;
pub(crate) const BIN_OUT_SHIFT: u32 = 7;
pub(crate) const BIN_ARGA_STACK: u32 = 1 << 13;
pub(crate) const BIN_ARGA_SHIFT: u32 = 14;
pub(crate) const BIN_ARGB_CONST: u32 = 1 << 20;
pub(crate) const BIN_ARGB_STACK: u32 = 1 << 31;
pub(crate) const BIN_ARGB_SHIFT: u32 = 21;

// Test shape: comparator | want | argA | argB, each argument a symmetric
// 11-bit field (const flag + 10-bit payload whose top bit is the stack
// flag for the non-const forms).
pub(crate) const TEST_CMP_SHIFT: u32 = 6;
pub(crate) const TEST_WANT: u32 = 1 << 9;
pub(crate) const TEST_ARGA_CONST: u32 = 1 << 10;
pub(crate) const TEST_ARGA_SHIFT: u32 = 11;
pub(crate) const TEST_ARGA_STACK: u32 = 1 << 20;
pub(crate) const TEST_ARGB_CONST: u32 = 1 << 21;
pub(crate) const TEST_ARGB_SHIFT: u32 = 22;
pub(crate) const TEST_ARGB_STACK: u32 = 1 << 31;

// Load, base form: 7-bit destination, 16-bit source payload.
pub(crate) const LOAD_DST_STACK: u32 = 1 << 6;
pub(crate) const LOAD_DST_SHIFT: u32 = 7;
pub(crate) const LOAD_SRC_CONST: u32 = 1 << 14;
pub(crate) const LOAD_SRC_STACK: u32 = 1 << 15;
pub(crate) const LOAD_SRC_SHIFT: u32 = 16;

// Load, extended form: 16-bit destination in word 0, 32-bit source in
// word 1.
pub(crate) const XLOAD_DST_STACK: u32 = 1 << 13;
pub(crate) const XLOAD_SRC_CONST: u32 = 1 << 14;
pub(crate) const XLOAD_SRC_STACK: u32 = 1 << 15;
pub(crate) const XLOAD_DST_SHIFT: u32 = 16;

// Jump: either a signed 25-bit literal offset, or an index whose loaded
// integer value is added to PC. The two forms are disjoint.
pub(crate) const JUMP_LITERAL: u32 = 1 << 6;
pub(crate) const JUMP_OFFSET_SHIFT: u32 = 7;
pub(crate) const JUMP_SRC_CONST: u32 = 1 << 7;
pub(crate) const JUMP_SRC_STACK: u32 = 1 << 8;
pub(crate) const JUMP_SRC_SHIFT: u32 = 9;

// Push/pop: 6-bit `count - 1` plus an 18-bit target payload.
pub(crate) const RANGE_COUNT_SHIFT: u32 = 6;
pub(crate) const RANGE_SRC_CONST: u32 = 1 << 12;
pub(crate) const RANGE_SRC_STACK: u32 = 1 << 13;
pub(crate) const RANGE_SRC_SHIFT: u32 = 14;

// Reserve: a single 24-bit index payload.
pub(crate) const RESERVE_SRC_CONST: u32 = 1 << 6;
pub(crate) const RESERVE_SRC_STACK: u32 = 1 << 7;
pub(crate) const RESERVE_SRC_SHIFT: u32 = 8;

#[inline]
fn field(w: u32, shift: u32, bits: u32) -> u32 {
    ((w as u64 >> shift) & ((1u64 << bits) - 1)) as u32
}

#[inline]
pub(crate) fn sign_extend(x: u32, bits: u32) -> i32 {
    ((x << (32 - bits)) as i32) >> (32 - bits)
}

/// A fetched instruction: the base word plus the extension word that
/// follows when the extension bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    base: u32,
    ext: Option<u32>,
}

impl Instruction {
    pub(crate) fn new(base: u32) -> Self {
        Self { base, ext: None }
    }

    pub(crate) fn wide(base: u32, ext: u32) -> Self {
        Self {
            base,
            ext: Some(ext),
        }
    }

    /// Reads the word at `pc`, consuming the following word as well when
    /// the extension bit is set and a next word exists.
    pub fn fetch(code: &[u32], pc: usize) -> Option<Instruction> {
        let base = *code.get(pc)?;
        let ext = if base & EXT_BIT != 0 {
            code.get(pc + 1).copied()
        } else {
            None
        };
        Some(Self { base, ext })
    }

    /// Number of 32-bit words this instruction occupies.
    pub fn words(&self) -> usize {
        1 + self.ext.is_some() as usize
    }

    pub fn is_wide(&self) -> bool {
        self.ext.is_some()
    }

    /// Appends the raw word(s) to a code stream.
    pub fn emit(&self, code: &mut Vec<u32>) {
        code.push(self.base);
        if let Some(ext) = self.ext {
            code.push(ext);
        }
    }

    pub fn opcode_raw(&self) -> u32 {
        if self.ext.is_some() {
            field(self.base, OPCODE_SHIFT, 12)
        } else {
            field(self.base, OPCODE_SHIFT, 5)
        }
    }

    pub fn opcode(&self) -> Result<Opcode, Fault> {
        Opcode::try_from(self.opcode_raw())
    }

    // Binary shape ------------------------------------------------------

    pub fn out(&self) -> Index {
        let raw = field(self.base, BIN_OUT_SHIFT, 6);
        if self.base & BIN_OUT_STACK != 0 {
            Index::Stack(sign_extend(raw, 6))
        } else {
            Index::Reg(raw as u16)
        }
    }

    pub fn arg_a(&self) -> Index {
        let raw = field(self.base, BIN_ARGA_SHIFT, 6);
        if self.base & BIN_ARGA_STACK != 0 {
            Index::Stack(sign_extend(raw, 6))
        } else {
            Index::Reg(raw as u16)
        }
    }

    /// Raw argA field bits; the rounding mode for `round`.
    pub fn arg_a_raw(&self) -> u32 {
        field(self.base, BIN_ARGA_SHIFT, 6)
    }

    pub fn arg_b(&self) -> Index {
        if self.base & BIN_ARGB_CONST != 0 {
            Index::Const(field(self.base, BIN_ARGB_SHIFT, 11))
        } else if self.base & BIN_ARGB_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, BIN_ARGB_SHIFT, 10), 10))
        } else {
            Index::Reg(field(self.base, BIN_ARGB_SHIFT, 6) as u16)
        }
    }

    // Test shape --------------------------------------------------------

    pub fn cmp(&self) -> Cmp {
        Cmp::from_raw(field(self.base, TEST_CMP_SHIFT, 3))
    }

    pub fn want(&self) -> bool {
        self.base & TEST_WANT != 0
    }

    pub fn test_a(&self) -> Index {
        if self.base & TEST_ARGA_CONST != 0 {
            Index::Const(field(self.base, TEST_ARGA_SHIFT, 10))
        } else if self.base & TEST_ARGA_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, TEST_ARGA_SHIFT, 9), 9))
        } else {
            Index::Reg(field(self.base, TEST_ARGA_SHIFT, 6) as u16)
        }
    }

    pub fn test_b(&self) -> Index {
        if self.base & TEST_ARGB_CONST != 0 {
            Index::Const(field(self.base, TEST_ARGB_SHIFT, 10))
        } else if self.base & TEST_ARGB_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, TEST_ARGB_SHIFT, 9), 9))
        } else {
            Index::Reg(field(self.base, TEST_ARGB_SHIFT, 6) as u16)
        }
    }

    // Load shape --------------------------------------------------------

    pub fn load_dst(&self) -> Index {
        if self.ext.is_some() {
            let raw = field(self.base, XLOAD_DST_SHIFT, 16);
            if self.base & XLOAD_DST_STACK != 0 {
                Index::Stack(sign_extend(raw, 16))
            } else {
                Index::Reg(raw as u16)
            }
        } else {
            let raw = field(self.base, LOAD_DST_SHIFT, 7);
            if self.base & LOAD_DST_STACK != 0 {
                Index::Stack(sign_extend(raw, 7))
            } else {
                Index::Reg(raw as u16)
            }
        }
    }

    pub fn load_src(&self) -> Index {
        if let Some(ext) = self.ext {
            if self.base & XLOAD_SRC_CONST != 0 {
                Index::Const(ext)
            } else if self.base & XLOAD_SRC_STACK != 0 {
                Index::Stack(ext as i32)
            } else {
                Index::Reg(ext as u16)
            }
        } else if self.base & LOAD_SRC_CONST != 0 {
            Index::Const(field(self.base, LOAD_SRC_SHIFT, 16))
        } else if self.base & LOAD_SRC_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, LOAD_SRC_SHIFT, 16), 16))
        } else {
            Index::Reg(field(self.base, LOAD_SRC_SHIFT, 6) as u16)
        }
    }

    // Jump shape --------------------------------------------------------

    pub fn jump_literal(&self) -> Option<i32> {
        if self.base & JUMP_LITERAL != 0 {
            Some(sign_extend(field(self.base, JUMP_OFFSET_SHIFT, 25), 25))
        } else {
            None
        }
    }

    pub fn jump_target(&self) -> Index {
        if self.base & JUMP_SRC_CONST != 0 {
            Index::Const(field(self.base, JUMP_SRC_SHIFT, 23))
        } else if self.base & JUMP_SRC_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, JUMP_SRC_SHIFT, 23), 23))
        } else {
            Index::Reg(field(self.base, JUMP_SRC_SHIFT, 6) as u16)
        }
    }

    // Push/pop shape ----------------------------------------------------

    pub fn range_count(&self) -> u32 {
        field(self.base, RANGE_COUNT_SHIFT, 6) + 1
    }

    pub fn range_target(&self) -> Index {
        if self.base & RANGE_SRC_CONST != 0 {
            Index::Const(field(self.base, RANGE_SRC_SHIFT, 18))
        } else if self.base & RANGE_SRC_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, RANGE_SRC_SHIFT, 18), 18))
        } else {
            Index::Reg(field(self.base, RANGE_SRC_SHIFT, 6) as u16)
        }
    }

    // Reserve shape -----------------------------------------------------

    pub fn reserve_src(&self) -> Index {
        if self.base & RESERVE_SRC_CONST != 0 {
            Index::Const(field(self.base, RESERVE_SRC_SHIFT, 24))
        } else if self.base & RESERVE_SRC_STACK != 0 {
            Index::Stack(sign_extend(field(self.base, RESERVE_SRC_SHIFT, 24), 24))
        } else {
            Index::Reg(field(self.base, RESERVE_SRC_SHIFT, 6) as u16)
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.opcode() {
            Ok(op) => op,
            Err(_) => return write!(f, "invalid({})", self.opcode_raw()),
        };
        match op {
            Opcode::Neg | Opcode::Not => write!(f, "{op} {} {}", self.out(), self.arg_a()),
            Opcode::Round => match RoundingMode::from_raw(self.arg_a_raw()) {
                Ok(mode) => write!(f, "round {} {mode} {}", self.out(), self.arg_b()),
                Err(_) => write!(f, "round {} mode({}) {}", self.out(), self.arg_a_raw(), self.arg_b()),
            },
            Opcode::Test => write!(
                f,
                "test ({} {} {}) == {}",
                self.test_a(),
                self.cmp(),
                self.test_b(),
                self.want()
            ),
            Opcode::Jump => match self.jump_literal() {
                Some(offset) => write!(f, "jump {offset}"),
                None => write!(f, "jump {}", self.jump_target()),
            },
            Opcode::Push | Opcode::Pop => {
                write!(f, "{op} {} {}", self.range_count(), self.range_target())
            }
            Opcode::Reserve => write!(f, "reserve {}", self.reserve_src()),
            Opcode::Load => {
                if self.is_wide() {
                    write!(f, "xload {} {}", self.load_dst(), self.load_src())
                } else {
                    write!(f, "load {} {}", self.load_dst(), self.load_src())
                }
            }
            Opcode::Call | Opcode::Return | Opcode::Defer | Opcode::Fork | Opcode::Join => {
                write!(f, "{op}")
            }
            _ => write!(f, "{op} {} {} {}", self.out(), self.arg_a(), self.arg_b()),
        }
    }
}

/// Renders a code block one instruction per line, prefixed with each
/// instruction's word offset.
pub fn disasm(code: &[u32]) -> String {
    let mut out = String::new();
    let mut pc = 0usize;
    while let Some(instr) = Instruction::fetch(code, pc) {
        let _ = writeln!(out, "{pc:4} {instr}");
        pc += instr.words();
    }
    out
}
