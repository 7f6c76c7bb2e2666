use std::fmt;

use serde::Serialize;

use super::fault::Fault;

/// Size of the dispatch table: the primary opcode field is 5 bits.
pub(crate) const OPCODE_SPACE: usize = 32;

/// Primary opcodes. `Call` through `Join` are allocated encoding slots
/// whose runtime semantics are deliberately absent; executing one faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Opcode {
    Add = 0,
    Sub = 1,
    Div = 2,
    Mul = 3,
    Pow = 4,
    Mod = 5,
    Neg = 6,
    Not = 7,
    Or = 8,
    And = 9,
    Xor = 10,
    AShift = 11,
    BShift = 12,
    Round = 13,
    Test = 14,
    Jump = 15,
    Push = 16,
    Pop = 17,
    Reserve = 18,
    Load = 19,
    Call = 20,
    Return = 21,
    Defer = 22,
    Fork = 23,
    Join = 24,
}

const NAMES: [&str; 25] = [
    "add", "sub", "div", "mul", "pow", "mod", "neg", "not", "or", "and", "xor", "ashift",
    "bshift", "round", "test", "jump", "push", "pop", "reserve", "load", "call", "return",
    "defer", "fork", "join",
];

const OPCODES: [Opcode; 25] = [
    Opcode::Add,
    Opcode::Sub,
    Opcode::Div,
    Opcode::Mul,
    Opcode::Pow,
    Opcode::Mod,
    Opcode::Neg,
    Opcode::Not,
    Opcode::Or,
    Opcode::And,
    Opcode::Xor,
    Opcode::AShift,
    Opcode::BShift,
    Opcode::Round,
    Opcode::Test,
    Opcode::Jump,
    Opcode::Push,
    Opcode::Pop,
    Opcode::Reserve,
    Opcode::Load,
    Opcode::Call,
    Opcode::Return,
    Opcode::Defer,
    Opcode::Fork,
    Opcode::Join,
];

impl Opcode {
    pub fn name(self) -> &'static str {
        NAMES[self as usize]
    }

    /// Binary shape: out, argA, argB.
    pub(crate) fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Div
                | Opcode::Mul
                | Opcode::Pow
                | Opcode::Mod
                | Opcode::Or
                | Opcode::And
                | Opcode::Xor
                | Opcode::AShift
                | Opcode::BShift
        )
    }
}

impl TryFrom<u32> for Opcode {
    type Error = Fault;

    fn try_from(raw: u32) -> Result<Self, Fault> {
        OPCODES
            .get(raw as usize)
            .copied()
            .ok_or(Fault::InvalidOpcode(raw))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Comparator carried by a `test` instruction. `Includes`/`Excludes` are
/// reserved slots: they encode and render but fault at evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Cmp {
    Lt = 0,
    Le = 1,
    Eq = 2,
    Ne = 3,
    Gt = 4,
    Ge = 5,
    Includes = 6,
    Excludes = 7,
}

const CMPS: [Cmp; 8] = [
    Cmp::Lt,
    Cmp::Le,
    Cmp::Eq,
    Cmp::Ne,
    Cmp::Gt,
    Cmp::Ge,
    Cmp::Includes,
    Cmp::Excludes,
];

impl Cmp {
    pub(crate) fn from_raw(raw: u32) -> Cmp {
        CMPS[(raw & 7) as usize]
    }
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Eq => "==",
            Cmp::Ne => "!=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Includes => "in",
            Cmp::Excludes => "!in",
        };
        write!(f, "{sym}")
    }
}
