// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The operand stack. Frames address it by absolute slot; everything else
//! works relative to the top.

use crate::value::Value;

use super::{Result, RuntimeError};

const INITIAL_CAPACITY: usize = 256;

/// The VM's value stack, shared by every frame.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        ValueStack {
            values: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Absolute index of the slot `distance` below the top (0 = top).
    fn index_from_top(&self, distance: usize) -> Result<usize> {
        self.values
            .len()
            .checked_sub(distance + 1)
            .ok_or(RuntimeError::StackUnderflow)
    }

    /// Absolute index where the top `n` values begin.
    fn window_start(&self, n: usize) -> Result<usize> {
        self.values
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&Value> {
        let index = self.index_from_top(distance)?;
        Ok(&self.values[index])
    }

    /// Read slot `index` (frame base plus local offset).
    #[inline]
    pub fn get(&self, index: usize) -> Result<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or(RuntimeError::StackUnderflow)
    }

    /// Overwrite slot `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(RuntimeError::StackUnderflow)?;
        *slot = value;
        Ok(())
    }

    /// Replace the value `distance` slots below the top.
    pub fn set_from_top(&mut self, distance: usize, value: Value) -> Result<()> {
        let index = self.index_from_top(distance)?;
        self.set(index, value)
    }

    /// The top `n` values, oldest first.
    pub fn top(&self, n: usize) -> Result<&[Value]> {
        let start = self.window_start(n)?;
        Ok(&self.values[start..])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop everything above `len`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    /// Remove the top `n` values, oldest first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        let start = self.window_start(n)?;
        Ok(self.values.split_off(start))
    }

    pub fn take_all(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_peek() {
        let mut stack = ValueStack::new();
        stack.push(Value::number(1));
        stack.push(Value::number(2));
        assert_eq!(stack.peek(0).unwrap(), &Value::number(2));
        assert_eq!(stack.peek(1).unwrap(), &Value::number(1));
        assert!(stack.peek(2).is_err());
        assert_eq!(stack.pop().unwrap(), Value::number(2));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_underflow_is_an_error() {
        let mut stack = ValueStack::new();
        assert_eq!(stack.pop(), Err(RuntimeError::StackUnderflow));
        assert_eq!(stack.pop_n(1), Err(RuntimeError::StackUnderflow));
        assert!(stack.set(0, Value::Null).is_err());
    }

    #[test]
    fn test_top_and_pop_n_keep_order() {
        let mut stack = ValueStack::new();
        for i in 0..4 {
            stack.push(Value::number(i));
        }
        assert_eq!(stack.top(2).unwrap(), &[Value::number(2), Value::number(3)]);
        assert_eq!(
            stack.pop_n(3).unwrap(),
            vec![Value::number(1), Value::number(2), Value::number(3)]
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_set_from_top() {
        let mut stack = ValueStack::new();
        stack.push(Value::number(1));
        stack.push(Value::number(2));
        stack.set_from_top(1, Value::Null).unwrap();
        assert_eq!(stack.get(0).unwrap(), Value::Null);
    }
}
