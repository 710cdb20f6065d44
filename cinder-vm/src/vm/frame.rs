// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use crate::chunk::Chunk;
use crate::object::Closure;

use super::error::TraceFrame;

/// A call frame on the VM's call stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The closure being executed.
    pub closure: Rc<Closure>,

    /// Instruction pointer (index into the closure's chunk code).
    pub ip: usize,

    /// Stack base: slot 0 of this frame holds the callee or receiver.
    pub base: usize,
}

impl CallFrame {
    pub fn new(closure: Rc<Closure>, base: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base,
        }
    }

    #[inline]
    pub fn chunk(&self) -> &Chunk {
        &self.closure.function.chunk
    }

    /// Source line of the instruction last fetched.
    pub fn current_line(&self) -> u32 {
        self.chunk()
            .line_at(self.ip.saturating_sub(1))
            .unwrap_or(0)
    }

    pub fn trace(&self) -> TraceFrame {
        TraceFrame {
            line: self.current_line(),
            function: self.closure.function.name.clone(),
        }
    }
}
