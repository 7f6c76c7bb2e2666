pub(super) use crate::val::Value;
pub(super) use crate::vm::{
    encode, Cmp, Fault, Function, Index, Instruction, Opcode, Thread,
};

mod control_flow;
mod encoding;
mod frames;
mod semantics;

/// Flattens encoded instructions into a word stream.
pub(super) fn assemble(instrs: &[Instruction]) -> Vec<u32> {
    let mut code = Vec::new();
    for instr in instrs {
        instr.emit(&mut code);
    }
    code
}

/// Builds a one-frame thread around `code`/`consts` and seeds the stack,
/// mirroring how an embedder loads a function.
pub(super) fn thread_with(code: Vec<u32>, consts: Vec<Value>, stack: Vec<Value>) -> Thread {
    let mut th = Thread::new();
    th.push_frame(0, Function::new(0, code, consts)).unwrap();
    for v in stack {
        th.push(v);
    }
    th
}
