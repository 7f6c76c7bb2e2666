//! A single-threaded register-plus-stack bytecode VM over tagged numeric
//! values: a fixed register file with aliased PC/EBP/ESP, an operand stack,
//! per-frame constants, and a packed 32/64-bit instruction encoding.

pub mod val;
pub mod vm;
