// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode chunks and compiled functions.

use std::fmt::Write as _;

use crate::opcode::OpCode;
use crate::value::Value;

/// A chunk of bytecode with its constant pool and line table.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Instruction and operand bytes.
    pub code: Vec<u8>,

    /// Source line of each byte in `code`. Same length as `code`.
    pub lines: Vec<u32>,

    /// Constant pool: literals, names, and nested functions.
    pub constants: Vec<Value>,
}

impl Chunk {
    /// Create a new empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one byte.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op.as_byte(), line);
    }

    /// Append a big-endian two-byte operand.
    pub fn write_u16(&mut self, value: u16, line: u32) {
        let [hi, lo] = value.to_be_bytes();
        self.write(hi, line);
        self.write(lo, line);
    }

    /// Add a constant to the pool and return its index.
    ///
    /// Constants are never deduplicated. Returns `None` once the pool holds
    /// more than `u16::MAX + 1` entries.
    pub fn add_constant(&mut self, value: Value) -> Option<u16> {
        let idx = u16::try_from(self.constants.len()).ok()?;
        self.constants.push(value);
        Some(idx)
    }

    /// Read the two-byte operand starting at `offset`.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = *self.code.get(offset)?;
        let lo = *self.code.get(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Back-patch the two-byte jump operand at `offset` to land on the current end of code.
    ///
    /// Returns `false` if the distance does not fit in two bytes.
    pub fn patch_jump(&mut self, offset: usize) -> bool {
        let distance = self.code.len() - offset - 2;
        match u16::try_from(distance) {
            Ok(d) => {
                let [hi, lo] = d.to_be_bytes();
                self.code[offset] = hi;
                self.code[offset + 1] = lo;
                true
            }
            Err(_) => false,
        }
    }

    /// Get the current code length (for jump targets).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Source line for the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    // ========================================================================
    // Disassembly
    // ========================================================================

    /// Render the whole chunk, one instruction per line.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        let mut offset = 0;
        while offset < self.code.len() {
            let (text, next) = self.disassemble_instruction(offset);
            out.push_str(&text);
            out.push('\n');
            offset = next;
        }
        out
    }

    /// Render the instruction at `offset`, returning the text and the offset of the next one.
    pub fn disassemble_instruction(&self, offset: usize) -> (String, usize) {
        let mut text = format!("{:04} ", offset);
        let line = self.line_at(offset).unwrap_or(0);
        if offset > 0 && self.line_at(offset - 1) == Some(line) {
            text.push_str("   | ");
        } else {
            let _ = write!(text, "{:4} ", line);
        }

        let op = match self.code.get(offset).map(|b| OpCode::try_from(*b)) {
            Some(Ok(op)) => op,
            Some(Err(byte)) => {
                let _ = write!(text, "<unknown opcode {}>", byte);
                return (text, offset + 1);
            }
            None => return (text, offset + 1),
        };

        let _ = write!(text, "{:<18}", op.name());
        match op {
            OpCode::Constant
            | OpCode::GetGlobal
            | OpCode::DefineGlobal
            | OpCode::DefineConstGlobal
            | OpCode::SetGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::GetSuper
            | OpCode::Class
            | OpCode::Method
            | OpCode::Closure => {
                let idx = self.read_u16(offset + 1).unwrap_or(0);
                let _ = write!(text, "{:4} '{}'", idx, self.constant_text(idx));
            }
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Call => {
                let operand = self.code.get(offset + 1).copied().unwrap_or(0);
                let _ = write!(text, "{:4}", operand);
            }
            OpCode::Jump | OpCode::JumpIfFalse => {
                let distance = self.read_u16(offset + 1).unwrap_or(0) as usize;
                let _ = write!(text, "{:4} -> {}", offset, offset + 3 + distance);
            }
            OpCode::Loop => {
                let distance = self.read_u16(offset + 1).unwrap_or(0) as usize;
                let target = (offset + 3).saturating_sub(distance);
                let _ = write!(text, "{:4} -> {}", offset, target);
            }
            OpCode::Invoke | OpCode::SuperInvoke => {
                let idx = self.read_u16(offset + 1).unwrap_or(0);
                let argc = self.code.get(offset + 3).copied().unwrap_or(0);
                let _ = write!(text, "({} args) {:4} '{}'", argc, idx, self.constant_text(idx));
            }
            OpCode::ArrayInit | OpCode::MapInit => {
                let count = self.read_u16(offset + 1).unwrap_or(0);
                let _ = write!(text, "{:4}", count);
            }
            _ => {}
        }

        (text, offset + 1 + op.operand_width())
    }

    fn constant_text(&self, idx: u16) -> String {
        self.constants
            .get(idx as usize)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<bad constant>".to_string())
    }
}

/// How a closure captures one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDescriptor {
    /// Slot in the enclosing frame (`is_local`) or index into the enclosing closure's upvalues.
    pub index: u8,

    /// Whether this captures the immediate parent's local rather than one of its upvalues.
    pub is_local: bool,
}

/// A compiled function: the unit the compiler produces and `Closure` instantiates.
#[derive(Debug, Clone, Default)]
pub struct Function {
    /// `None` for the top-level script.
    pub name: Option<String>,

    pub arity: u8,

    /// Carried through the serialized form; the compiler always emits `false`.
    pub is_constant: bool,

    pub upvalues: Vec<UpvalueDescriptor>,

    pub chunk: Chunk,
}

impl Function {
    /// Create an empty function with the given name.
    pub fn new(name: Option<String>) -> Self {
        Function {
            name,
            ..Default::default()
        }
    }

    /// The name shown in stack traces.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("main script")
    }

    /// Disassemble this function and every function in its constant pool.
    pub fn disassemble(&self) -> String {
        let mut out = self.chunk.disassemble(self.display_name());
        for constant in &self.chunk.constants {
            if let Value::Function(nested) = constant {
                out.push('\n');
                out.push_str(&nested.disassemble());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_keeps_lines_parallel() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_u16(300, 1);
        chunk.write_op(OpCode::Return, 2);
        assert_eq!(chunk.code.len(), chunk.lines.len());
        assert_eq!(chunk.read_u16(1), Some(300));
        assert_eq!(chunk.line_at(3), Some(2));
    }

    #[test]
    fn test_constants_not_deduplicated() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::from("a")), Some(0));
        assert_eq!(chunk.add_constant(Value::from("a")), Some(1));
    }

    #[test]
    fn test_patch_jump() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Jump, 1);
        chunk.write_u16(u16::MAX, 1);
        chunk.write_op(OpCode::Null, 1);
        chunk.write_op(OpCode::Pop, 1);
        assert!(chunk.patch_jump(1));
        assert_eq!(chunk.read_u16(1), Some(2));
    }

    #[test]
    fn test_patch_jump_too_far() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Jump, 1);
        chunk.write_u16(0, 1);
        for _ in 0..70_000 {
            chunk.write_op(OpCode::Null, 1);
        }
        assert!(!chunk.patch_jump(1));
    }

    #[test]
    fn test_disassemble_instruction() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::number(7)).unwrap();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_u16(idx, 1);
        chunk.write_op(OpCode::Return, 1);
        let (text, next) = chunk.disassemble_instruction(0);
        assert!(text.contains("Constant"));
        assert!(text.contains("'7'"));
        assert_eq!(next, 3);
        let (text, next) = chunk.disassemble_instruction(3);
        assert!(text.contains("|"));
        assert!(text.contains("Return"));
        assert_eq!(next, 4);
    }
}
