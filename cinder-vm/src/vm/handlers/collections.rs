// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collection opcode handlers: array and map literals, subscripts.
//!
//! Subscripts dispatch to the receiver's native `get` and `set` methods, so
//! any native class providing them can be indexed.

use crate::natives::{array, map};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute a collection opcode.
    pub(crate) fn execute_collections(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::ArrayInit => {
                let count = self.read_u16()? as usize;
                let items = self.stack.pop_n(count)?;
                self.stack.push(array::new_array(items));
            }
            OpCode::MapInit => {
                let pairs = self.read_u16()? as usize;
                let flat = self.stack.pop_n(pairs * 2)?;
                let mut values = flat.into_iter();
                let mut entries = Vec::with_capacity(pairs);
                while let (Some(key), Some(value)) = (values.next(), values.next()) {
                    entries.push((key, value));
                }
                self.stack.push(map::new_map(entries));
            }
            OpCode::SubscriptGet => self.subscript("get", 1)?,
            OpCode::SubscriptSet => {
                let value = self.stack.peek(0)?.clone();
                self.subscript("set", 2)?;
                // `a[i] = v` evaluates to `v`.
                self.stack.pop()?;
                self.stack.push(value);
            }
            _ => unreachable!("execute_collections called with {:?}", op),
        }
        Ok(())
    }

    /// Call native `method` on the receiver below the top `argc` values.
    fn subscript(&mut self, method: &str, argc: usize) -> Result<()> {
        let Value::Instance(instance) = self.stack.peek(argc)?.clone() else {
            return Err(RuntimeError::NotSubscriptable);
        };
        let handler = instance
            .native_class()
            .and_then(|class| class.method(method))
            .ok_or(RuntimeError::NotSubscriptable)?;
        self.call_native_method(&instance, &handler, argc)
    }
}
