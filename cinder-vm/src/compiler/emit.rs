// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode emission into the innermost function's chunk.

use crate::chunk::Chunk;
use crate::opcode::OpCode;
use crate::value::Value;

use super::Compiler;
use super::types::FunctionKind;

impl<'src> Compiler<'src> {
    #[inline]
    pub(crate) fn chunk(&mut self) -> &mut Chunk {
        &mut self.scope_mut().function.chunk
    }

    pub(crate) fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk().write(byte, line);
    }

    pub(crate) fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.as_byte());
    }

    pub(crate) fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    /// Emit an instruction with a one-byte operand.
    pub(crate) fn emit_op_u8(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    /// Emit an instruction with a two-byte operand.
    pub(crate) fn emit_op_u16(&mut self, op: OpCode, operand: u16) {
        let line = self.previous.line;
        self.emit_op(op);
        self.chunk().write_u16(operand, line);
    }

    /// Emit a constant load.
    pub(crate) fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit_op_u16(OpCode::Constant, idx);
    }

    /// Add a value to the constant pool.
    pub(crate) fn make_constant(&mut self, value: Value) -> u16 {
        match self.chunk().add_constant(value) {
            Some(idx) => idx,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    /// Add a name to the constant pool.
    pub(crate) fn identifier_constant(&mut self, name: &str) -> u16 {
        self.make_constant(Value::string(name))
    }

    /// Emit a jump with a placeholder offset and return the operand position.
    pub(crate) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op_u16(op, u16::MAX);
        self.chunk().current_offset() - 2
    }

    pub(crate) fn patch_jump(&mut self, offset: usize) {
        if !self.chunk().patch_jump(offset) {
            self.error("Too much code to jump over.");
        }
    }

    /// Emit a backward jump to `loop_start`.
    pub(crate) fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let distance = self.chunk().current_offset() - loop_start + 2;
        let operand = match u16::try_from(distance) {
            Ok(d) => d,
            Err(_) => {
                self.error("Loop body too large.");
                0
            }
        };
        let line = self.previous.line;
        self.chunk().write_u16(operand, line);
    }

    /// Implicit return: `this` from initializers, `null` otherwise.
    pub(crate) fn emit_return(&mut self) {
        if self.scope().kind == FunctionKind::Initializer {
            self.emit_op_u8(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Null);
        }
        self.emit_op(OpCode::Return);
    }
}
