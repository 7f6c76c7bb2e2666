//! Thread state: the register file with its aliased PC/EBP/ESP, the
//! operand stack, the frame chain, and the embedding API.

use std::sync::Arc;

use tracing::debug;

use crate::val::Value;

use super::fault::Fault;
use super::index::{Index, REG_EBP, REG_ESP, REG_PC};

pub const REGISTER_COUNT: usize = 64;

const DEFAULT_STACK_SIZE: usize = 512;
const DEFAULT_FRAME_DEPTH: usize = 16;

/// The unit of loadable code: an entry PC, a packed word stream, and the
/// constants those words may reference.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub entry: i64,
    pub code: Arc<[u32]>,
    pub consts: Arc<[Value]>,
}

impl Function {
    pub fn new(entry: i64, code: Vec<u32>, consts: Vec<Value>) -> Self {
        Self {
            entry,
            code: code.into(),
            consts: consts.into(),
        }
    }
}

/// Saved execution context of a suspended caller.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pc: i64,
    ebp: usize,
    func: Function,
}

/// A single-threaded execution context. The current frame is flattened
/// into the thread; registers 3.. are shared across frames, with
/// call conventions responsible for preserving them.
pub struct Thread {
    pub(crate) pc: i64,
    pub(crate) ebp: usize,
    pub(crate) func: Function,
    pub(crate) regs: [Value; REGISTER_COUNT],
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
}

impl Thread {
    pub fn new() -> Self {
        Self {
            pc: 0,
            ebp: 0,
            func: Function::default(),
            regs: std::array::from_fn(|_| Value::Empty),
            stack: Vec::with_capacity(DEFAULT_STACK_SIZE),
            frames: Vec::with_capacity(DEFAULT_FRAME_DEPTH),
        }
    }

    pub fn pc(&self) -> i64 {
        self.pc
    }

    pub fn ebp(&self) -> usize {
        self.ebp
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn code(&self) -> &[u32] {
        &self.func.code
    }

    /// Installs `func` as the running frame. `ebp_offset` must be <= 0;
    /// a negative offset carves that many slots off the top of the
    /// caller's window into the callee's visible stack (argument
    /// passing).
    pub fn push_frame(&mut self, ebp_offset: i64, func: Function) -> Result<(), Fault> {
        if ebp_offset > 0 {
            return Err(Fault::InvalidStackIndex(self.stack.len() as i64 + ebp_offset));
        }
        let new_ebp = self.stack.len() as i64 + ebp_offset;
        if new_ebp < self.ebp as i64 {
            return Err(Fault::StackUnderflow);
        }
        let caller = Frame {
            pc: self.pc,
            ebp: self.ebp,
            func: std::mem::replace(&mut self.func, func),
        };
        self.frames.push(caller);
        self.pc = self.func.entry;
        self.ebp = new_ebp as usize;
        debug!(pc = self.pc, ebp = self.ebp, depth = self.frames.len(), "frame pushed");
        Ok(())
    }

    /// Tail-call: collapses the current frame to its base keeping the top
    /// `keep` slots, and installs `func` in place. The frame chain depth
    /// does not change.
    pub fn replace_frame(&mut self, keep: usize, func: Function) -> Result<(), Fault> {
        self.copy_and_resize_stack(self.ebp, keep)?;
        self.func = func;
        self.pc = self.func.entry;
        Ok(())
    }

    /// Symmetric teardown: moves the top `keep` slots down to the frame
    /// base and restores the saved caller.
    pub fn pop_frame(&mut self, keep: usize) -> Result<(), Fault> {
        if self.frames.is_empty() {
            return Err(Fault::StackUnderflow);
        }
        self.copy_and_resize_stack(self.ebp, keep)?;
        let Some(frame) = self.frames.pop() else {
            return Err(Fault::StackUnderflow);
        };
        self.pc = frame.pc;
        self.ebp = frame.ebp;
        self.func = frame.func;
        debug!(pc = self.pc, ebp = self.ebp, depth = self.frames.len(), "frame popped");
        Ok(())
    }

    /// Resizes the stack to `new_top` plus the top `keep` slots moved
    /// down to start at `new_top`. The new top and the kept slots may not
    /// overlap.
    fn copy_and_resize_stack(&mut self, new_top: usize, keep: usize) -> Result<(), Fault> {
        if new_top + keep == self.stack.len() {
            return Ok(());
        }
        if keep > 0 {
            let old_top = self
                .stack
                .len()
                .checked_sub(keep)
                .ok_or(Fault::StackUnderflow)?;
            if new_top > old_top {
                return Err(Fault::StackUnderflow);
            }
            for i in 0..keep {
                self.stack[new_top + i] = self.stack[old_top + i].clone();
            }
        }
        self.resize_stack(new_top + keep);
        Ok(())
    }

    pub fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    pub fn pop(&mut self) -> Result<Value, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    /// Reads a value through an index without executing any code.
    pub fn at(&self, index: Index) -> Result<Value, Fault> {
        self.load(index)
    }

    /// Truncates the stack to `top`, clearing the dropped slots first so
    /// a shared view of the backing storage cannot resurrect them. A
    /// no-op when `top` is at or beyond the current length.
    pub(crate) fn resize_stack(&mut self, top: usize) {
        if self.stack.len() <= top {
            return;
        }
        for slot in &mut self.stack[top..] {
            *slot = Value::Empty;
        }
        self.stack.truncate(top);
    }

    /// Grows stack capacity by at least `elems` entries; the length is
    /// unchanged.
    pub(crate) fn grow_stack(&mut self, elems: i64) {
        if elems > 0 {
            self.stack.reserve(elems as usize);
        }
    }

    fn set_stack_len(&mut self, new_len: i64) -> Result<(), Fault> {
        if new_len < self.ebp as i64 {
            return Err(Fault::StackUnderflow);
        }
        let new_len = new_len as usize;
        if new_len <= self.stack.len() {
            self.resize_stack(new_len);
        } else {
            self.stack.resize(new_len, Value::Empty);
        }
        Ok(())
    }

    /// Resolves a stack displacement: non-negative offsets are
    /// frame-relative, negative offsets count back from the top.
    pub(crate) fn resolve_stack(&self, i: i32) -> Result<usize, Fault> {
        let at = if i < 0 {
            self.stack.len() as i64 + i as i64
        } else {
            self.ebp as i64 + i as i64
        };
        if at < 0 || at >= self.stack.len() as i64 {
            return Err(Fault::InvalidStackIndex(i as i64));
        }
        Ok(at as usize)
    }

    pub(crate) fn load(&self, index: Index) -> Result<Value, Fault> {
        match index {
            Index::Reg(REG_PC) => Ok(Value::Int(self.pc)),
            Index::Reg(REG_EBP) => Ok(Value::Int(self.ebp as i64)),
            Index::Reg(REG_ESP) => Ok(Value::Int(self.stack.len() as i64)),
            Index::Reg(n) => self
                .regs
                .get(n as usize)
                .cloned()
                .ok_or(Fault::InvalidRegister(n)),
            Index::Stack(i) => {
                let at = self.resolve_stack(i)?;
                Ok(self.stack[at].clone())
            }
            Index::Const(k) => self
                .func
                .consts
                .get(k as usize)
                .cloned()
                .ok_or(Fault::InvalidConstIndex(k)),
        }
    }

    pub(crate) fn store(&mut self, index: Index, v: Value) -> Result<(), Fault> {
        match index {
            Index::Reg(REG_PC) => self.store_pc(v),
            Index::Reg(REG_EBP) => Err(Fault::EbpStore),
            Index::Reg(REG_ESP) => {
                let len = alias_int(&v).ok_or(Fault::TypeFault(v.type_name()))?;
                self.set_stack_len(len)
            }
            Index::Reg(n) => match self.regs.get_mut(n as usize) {
                Some(slot) => {
                    *slot = v;
                    Ok(())
                }
                None => Err(Fault::InvalidRegister(n)),
            },
            Index::Stack(i) => {
                let at = self.resolve_stack(i)?;
                self.stack[at] = v;
                Ok(())
            }
            Index::Const(k) => Err(Fault::ConstStore(k)),
        }
    }

    fn store_pc(&mut self, v: Value) -> Result<(), Fault> {
        let next = match v {
            Value::Int(i) => i,
            Value::Uint(u) => match i64::try_from(u) {
                Ok(next) => next,
                Err(_) => return Err(Fault::PcRange(i64::MAX)),
            },
            other => return Err(Fault::InvalidPcStore(other.type_name())),
        };
        if next < 0 || next > self.func.code.len() as i64 {
            return Err(Fault::PcRange(next));
        }
        self.pc = next;
        Ok(())
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

fn alias_int(v: &Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(*i),
        Value::Uint(u) => i64::try_from(*u).ok(),
        _ => None,
    }
}
