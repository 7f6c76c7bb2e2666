use std::fmt;

use super::opcode::{Cmp, Opcode};
use super::thread::REGISTER_COUNT;

/// Fatal execution faults. A fault aborts the current run; there is no
/// recovery from within bytecode. The unprotected entry propagates these
/// unchanged, the protected entry wraps them while keeping the kind
/// reachable through `downcast_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    InvalidRegister(u16),
    InvalidStackIndex(i64),
    InvalidConstIndex(u32),
    InvalidOpcode(u32),
    InvalidRoundingMode(u32),
    /// Push/pop slot count outside 1..=64.
    InvalidRange(u32),
    StackUnderflow,
    PcRange(i64),
    ConstStore(u32),
    EbpStore,
    /// Operand type with no arithmetic interpretation.
    TypeFault(&'static str),
    InvalidPcStore(&'static str),
    DivisionByZero,
    UnimplementedOpcode(Opcode),
    InvalidComparator(Cmp),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::InvalidRegister(n) => {
                write!(f, "register {n} out of range 0..{}", REGISTER_COUNT - 1)
            }
            Fault::InvalidStackIndex(i) => write!(f, "stack index {i} out of range"),
            Fault::InvalidConstIndex(k) => write!(f, "constant index {k} out of range"),
            Fault::InvalidOpcode(op) => write!(f, "invalid opcode {op}"),
            Fault::InvalidRoundingMode(m) => write!(f, "invalid rounding mode: {m:x}"),
            Fault::InvalidRange(n) => write!(f, "slot count {n} outside 1..=64"),
            Fault::StackUnderflow => write!(f, "stack underflow"),
            Fault::PcRange(pc) => write!(f, "PC {pc} outside code range"),
            Fault::ConstStore(k) => {
                write!(f, "attempt to write to constants table (const[{k}])")
            }
            Fault::EbpStore => write!(f, "attempt to write to EBP"),
            Fault::TypeFault(kind) => write!(f, "unable to use {kind} value as a number"),
            Fault::InvalidPcStore(kind) => write!(f, "invalid type for PC: {kind}"),
            Fault::DivisionByZero => write!(f, "integer division by zero"),
            Fault::UnimplementedOpcode(op) => {
                write!(f, "opcode {op} has no runtime semantics")
            }
            Fault::InvalidComparator(cmp) => write!(f, "comparator {cmp} is reserved"),
        }
    }
}

impl std::error::Error for Fault {}
