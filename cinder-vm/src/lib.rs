// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Cinder.
//!
//! Source is compiled in a single pass to a [`Function`] holding a bytecode
//! [`Chunk`], then executed by the [`Vm`]. Compiled functions can be
//! serialized to JSON and loaded back without recompiling.

pub mod chunk;
pub mod compiler;
pub mod natives;
pub mod object;
pub mod opcode;
pub mod serialize;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, Function, UpvalueDescriptor};
pub use compiler::{CompileError, CompileErrors, compile};
pub use natives::{NativeClass, NativeError, NativeFunction, NativeResult};
pub use object::{BoundMethod, Class, Closure, Instance, InstanceClass};
pub use opcode::OpCode;
pub use serialize::SerializeError;
pub use value::Value;
pub use vm::{
    GasCosts, InterpretResult, InterpretStatus, RuntimeDiagnostic, RuntimeError, SetGlobal,
    SharedBuffer, Vm, VmConfig,
};
