// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Local and global variable opcode handlers.

use crate::opcode::OpCode;
use crate::vm::{Global, Result, RuntimeError, Vm};

impl Vm {
    /// Execute a variable access opcode.
    pub(crate) fn execute_variables(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::GetLocal => {
                let slot = self.read_byte()? as usize;
                let base = self.frame()?.base;
                let value = self.stack.get(base + slot)?;
                self.stack.push(value);
            }
            OpCode::SetLocal => {
                let slot = self.read_byte()? as usize;
                let base = self.frame()?.base;
                let value = self.stack.peek(0)?.clone();
                self.stack.set(base + slot, value)?;
            }
            OpCode::GetGlobal => {
                let name = self.read_name()?;
                let value = match self.globals.get(&*name) {
                    Some(global) => global.value.clone(),
                    None => return Err(RuntimeError::UndefinedVariable(name.to_string())),
                };
                self.stack.push(value);
            }
            OpCode::DefineGlobal | OpCode::DefineConstGlobal => {
                let name = self.read_name()?;
                if self.globals.get(&*name).is_some_and(|g| g.is_const) {
                    return Err(RuntimeError::ConstGlobal(name.to_string()));
                }
                let value = self.stack.peek(0)?.clone();
                let is_const = op == OpCode::DefineConstGlobal;
                self.globals
                    .insert(name.to_string(), Global { value, is_const });
                self.stack.pop()?;
            }
            OpCode::SetGlobal => {
                let name = self.read_name()?;
                let value = self.stack.peek(0)?.clone();
                match self.globals.get_mut(&*name) {
                    None => return Err(RuntimeError::UndefinedVariable(name.to_string())),
                    Some(global) if global.is_const => {
                        return Err(RuntimeError::ConstGlobal(name.to_string()));
                    }
                    // Assignment is an expression: the value stays on the stack.
                    Some(global) => global.value = value,
                }
            }
            _ => unreachable!("execute_variables called with {:?}", op),
        }
        Ok(())
    }
}
