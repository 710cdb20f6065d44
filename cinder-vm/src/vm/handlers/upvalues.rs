// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Upvalue opcode handlers and the open-upvalue list.
//!
//! An upvalue starts open, aliasing a live stack slot. When that slot goes
//! out of scope the upvalue is closed: the value moves into the cell and
//! every closure sharing the cell keeps seeing the same variable.

use std::cell::RefCell;
use std::rc::Rc;

use crate::object::{Upvalue, UpvalueRef};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute an upvalue opcode.
    pub(crate) fn execute_upvalues(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::GetUpvalue => {
                let index = self.read_byte()? as usize;
                let cell = self.upvalue_cell(index)?;
                let value = match &*cell.borrow() {
                    Upvalue::Open(slot) => self.stack.get(*slot)?,
                    Upvalue::Closed(value) => value.clone(),
                };
                self.stack.push(value);
            }
            OpCode::SetUpvalue => {
                let index = self.read_byte()? as usize;
                let cell = self.upvalue_cell(index)?;
                let value = self.stack.peek(0)?.clone();
                let open_slot = match &mut *cell.borrow_mut() {
                    Upvalue::Open(slot) => Some(*slot),
                    Upvalue::Closed(stored) => {
                        *stored = value.clone();
                        None
                    }
                };
                if let Some(slot) = open_slot {
                    self.stack.set(slot, value)?;
                }
            }
            OpCode::CloseUpvalue => {
                let top = self
                    .stack
                    .len()
                    .checked_sub(1)
                    .ok_or(RuntimeError::StackUnderflow)?;
                self.close_upvalues(top);
                self.stack.pop()?;
            }
            _ => unreachable!("execute_upvalues called with {:?}", op),
        }
        Ok(())
    }

    fn upvalue_cell(&self, index: usize) -> Result<UpvalueRef> {
        self.frame()?
            .closure
            .upvalues
            .get(index)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("Upvalue {} out of range", index)))
    }

    /// Find or create the open upvalue for a stack slot.
    ///
    /// Two closures capturing the same slot share one cell.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> UpvalueRef {
        let mut insert_at = self.open_upvalues.len();
        for (i, cell) in self.open_upvalues.iter().enumerate() {
            match open_slot(cell) {
                Some(open) if open == slot => return cell.clone(),
                Some(open) if open < slot => {
                    insert_at = i;
                    break;
                }
                _ => {}
            }
        }
        let cell = Rc::new(RefCell::new(Upvalue::Open(slot)));
        self.open_upvalues.insert(insert_at, cell.clone());
        cell
    }

    /// Close every open upvalue at or above `last`, highest slot first.
    pub(crate) fn close_upvalues(&mut self, last: usize) {
        while let Some(cell) = self.open_upvalues.first() {
            match open_slot(cell) {
                Some(slot) if slot < last => break,
                Some(slot) => {
                    let value = self.stack.get(slot).unwrap_or(Value::Null);
                    *cell.borrow_mut() = Upvalue::Closed(value);
                }
                None => {}
            }
            self.open_upvalues.remove(0);
        }
    }
}

fn open_slot(cell: &UpvalueRef) -> Option<usize> {
    match &*cell.borrow() {
        Upvalue::Open(slot) => Some(*slot),
        Upvalue::Closed(_) => None,
    }
}
