// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.

use std::fmt;

/// Bytecode instructions for the Cinder VM.
///
/// Each instruction is one byte, followed by its operands. Constant-pool and
/// name operands are two bytes big-endian; slot, upvalue and argument-count
/// operands are one byte. Jump offsets are unsigned two-byte distances measured
/// from the byte after the operand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    // =========================================================================
    // Constants & Stack
    // =========================================================================
    /// `Constant idx:u16` push constants[idx].
    Constant = 0,
    Null,
    True,
    False,
    Pop,

    // =========================================================================
    // Variables
    // =========================================================================
    /// `GetLocal slot:u8` push stack[base + slot].
    GetLocal,
    /// `SetLocal slot:u8` stack[base + slot] = peek(0).
    SetLocal,
    /// `GetGlobal name:u16`
    GetGlobal,
    /// `DefineGlobal name:u16` bind pop() to a mutable global.
    DefineGlobal,
    /// `DefineConstGlobal name:u16` bind pop() to a const global.
    DefineConstGlobal,
    /// `SetGlobal name:u16` assign peek(0) to an existing global.
    SetGlobal,
    /// `GetUpvalue idx:u8`
    GetUpvalue,
    /// `SetUpvalue idx:u8`
    SetUpvalue,
    /// `GetProperty name:u16`
    GetProperty,
    /// `SetProperty name:u16`
    SetProperty,
    /// `GetSuper name:u16` pops the superclass, replaces the receiver with a bound method.
    GetSuper,

    // =========================================================================
    // Comparison
    // =========================================================================
    Equal,
    Greater,
    Less,

    // =========================================================================
    // Arithmetic & Bitwise
    // =========================================================================
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    ShiftLeft,
    ShiftRight,
    Not,
    Negate,

    // =========================================================================
    // Statements
    // =========================================================================
    Print,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// `Jump offset:u16` forward jump.
    Jump,
    /// `JumpIfFalse offset:u16` forward jump when peek(0) is falsy. Does not pop.
    JumpIfFalse,
    /// `Loop offset:u16` backward jump.
    Loop,

    // =========================================================================
    // Functions & Closures
    // =========================================================================
    /// `Call argc:u8`
    Call,
    /// `Invoke name:u16 argc:u8`
    Invoke,
    /// `SuperInvoke name:u16 argc:u8`
    SuperInvoke,
    /// `Closure fn:u16` captures per the function's upvalue descriptors.
    Closure,
    CloseUpvalue,
    Return,

    // =========================================================================
    // Classes
    // =========================================================================
    /// `Class name:u16`
    Class,
    /// Copy the superclass (peek 1) methods into the subclass (peek 0), pop the subclass.
    Inherit,
    /// `Method name:u16` attach the closure at peek(0) to the class at peek(1).
    Method,

    // =========================================================================
    // Collections
    // =========================================================================
    /// `ArrayInit count:u16`
    ArrayInit,
    /// `MapInit pairs:u16`
    MapInit,
    SubscriptGet,
    SubscriptSet,
}

impl OpCode {
    /// Every opcode, in byte order.
    pub const ALL: [OpCode; 50] = [
        OpCode::Constant,
        OpCode::Null,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetGlobal,
        OpCode::DefineGlobal,
        OpCode::DefineConstGlobal,
        OpCode::SetGlobal,
        OpCode::GetUpvalue,
        OpCode::SetUpvalue,
        OpCode::GetProperty,
        OpCode::SetProperty,
        OpCode::GetSuper,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Modulo,
        OpCode::Power,
        OpCode::BitAnd,
        OpCode::BitOr,
        OpCode::BitXor,
        OpCode::BitNot,
        OpCode::ShiftLeft,
        OpCode::ShiftRight,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Print,
        OpCode::Jump,
        OpCode::JumpIfFalse,
        OpCode::Loop,
        OpCode::Call,
        OpCode::Invoke,
        OpCode::SuperInvoke,
        OpCode::Closure,
        OpCode::CloseUpvalue,
        OpCode::Return,
        OpCode::Class,
        OpCode::Inherit,
        OpCode::Method,
        OpCode::ArrayInit,
        OpCode::MapInit,
        OpCode::SubscriptGet,
        OpCode::SubscriptSet,
    ];

    /// The opcode's byte encoding.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Width in bytes of the operands that follow the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Call => 1,
            OpCode::Constant
            | OpCode::GetGlobal
            | OpCode::DefineGlobal
            | OpCode::DefineConstGlobal
            | OpCode::SetGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::GetSuper
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::Loop
            | OpCode::Closure
            | OpCode::Class
            | OpCode::Method
            | OpCode::ArrayInit
            | OpCode::MapInit => 2,
            OpCode::Invoke | OpCode::SuperInvoke => 3,
            _ => 0,
        }
    }

    /// Look an opcode up by its name, as used in gas cost tables.
    pub fn from_name(name: &str) -> Option<OpCode> {
        OpCode::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// The instruction's mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "Constant",
            OpCode::Null => "Null",
            OpCode::True => "True",
            OpCode::False => "False",
            OpCode::Pop => "Pop",
            OpCode::GetLocal => "GetLocal",
            OpCode::SetLocal => "SetLocal",
            OpCode::GetGlobal => "GetGlobal",
            OpCode::DefineGlobal => "DefineGlobal",
            OpCode::DefineConstGlobal => "DefineConstGlobal",
            OpCode::SetGlobal => "SetGlobal",
            OpCode::GetUpvalue => "GetUpvalue",
            OpCode::SetUpvalue => "SetUpvalue",
            OpCode::GetProperty => "GetProperty",
            OpCode::SetProperty => "SetProperty",
            OpCode::GetSuper => "GetSuper",
            OpCode::Equal => "Equal",
            OpCode::Greater => "Greater",
            OpCode::Less => "Less",
            OpCode::Add => "Add",
            OpCode::Subtract => "Subtract",
            OpCode::Multiply => "Multiply",
            OpCode::Divide => "Divide",
            OpCode::Modulo => "Modulo",
            OpCode::Power => "Power",
            OpCode::BitAnd => "BitAnd",
            OpCode::BitOr => "BitOr",
            OpCode::BitXor => "BitXor",
            OpCode::BitNot => "BitNot",
            OpCode::ShiftLeft => "ShiftLeft",
            OpCode::ShiftRight => "ShiftRight",
            OpCode::Not => "Not",
            OpCode::Negate => "Negate",
            OpCode::Print => "Print",
            OpCode::Jump => "Jump",
            OpCode::JumpIfFalse => "JumpIfFalse",
            OpCode::Loop => "Loop",
            OpCode::Call => "Call",
            OpCode::Invoke => "Invoke",
            OpCode::SuperInvoke => "SuperInvoke",
            OpCode::Closure => "Closure",
            OpCode::CloseUpvalue => "CloseUpvalue",
            OpCode::Return => "Return",
            OpCode::Class => "Class",
            OpCode::Inherit => "Inherit",
            OpCode::Method => "Method",
            OpCode::ArrayInit => "ArrayInit",
            OpCode::MapInit => "MapInit",
            OpCode::SubscriptGet => "SubscriptGet",
            OpCode::SubscriptSet => "SubscriptSet",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    /// Decode a byte, returning the byte back if it names no instruction.
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_byte_order() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(op.as_byte() as usize, i, "{} out of order", op);
        }
    }

    #[test]
    fn test_decode_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(op.as_byte()), Ok(op));
        }
        assert_eq!(OpCode::try_from(200), Err(200));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(OpCode::from_name("Add"), Some(OpCode::Add));
        assert_eq!(OpCode::from_name("SuperInvoke"), Some(OpCode::SuperInvoke));
        assert_eq!(OpCode::from_name("Nope"), None);
    }

    #[test]
    fn test_operand_widths() {
        assert_eq!(OpCode::Constant.operand_width(), 2);
        assert_eq!(OpCode::GetLocal.operand_width(), 1);
        assert_eq!(OpCode::Invoke.operand_width(), 3);
        assert_eq!(OpCode::Add.operand_width(), 0);
    }
}
