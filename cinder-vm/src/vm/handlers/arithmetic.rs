// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic, bitwise, comparison and logical opcode handlers.
//!
//! Numbers are arbitrary-precision integers. Division truncates toward zero,
//! `%` takes the sign of the dividend, and `>>` is an arithmetic shift.
//!
//! Operators that can grow a number by more than a bit (`*`, `**`, `<<`)
//! refuse results past [`MAX_NUMBER_BITS`], checked before any work is
//! done, so a single instruction stays cheap.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, Vm};

/// Largest magnitude, in bits, that `*`, `**` and `<<` will produce.
pub const MAX_NUMBER_BITS: u64 = 1 << 20;

impl Vm {
    /// Execute an arithmetic, comparison or logical opcode.
    pub(crate) fn execute_arithmetic(&mut self, op: OpCode) -> Result<()> {
        let result = match op {
            OpCode::Not => Value::Bool(self.stack.pop()?.is_falsy()),
            OpCode::Negate => match self.stack.pop()? {
                Value::Number(n) => Value::Number(-n),
                _ => return Err(RuntimeError::OperandMustBeNumber),
            },
            OpCode::BitNot => match self.stack.pop()? {
                Value::Number(n) => Value::Number(!n),
                _ => return Err(RuntimeError::OperandMustBeNumber),
            },
            OpCode::Equal => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                Value::Bool(a == b)
            }
            OpCode::Add => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                match (a, b) {
                    (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                    (Value::String(a), Value::String(b)) => {
                        let mut joined = String::with_capacity(a.len() + b.len());
                        joined.push_str(&a);
                        joined.push_str(&b);
                        Value::string(joined)
                    }
                    _ => return Err(RuntimeError::OperandsMustBeNumbersOrStrings),
                }
            }
            _ => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                match (a, b) {
                    (Value::Number(a), Value::Number(b)) => binary_number(op, a, b)?,
                    _ => return Err(RuntimeError::OperandsMustBeNumbers),
                }
            }
        };
        self.stack.push(result);
        Ok(())
    }
}

/// Apply a binary numeric opcode.
fn binary_number(op: OpCode, a: BigInt, b: BigInt) -> Result<Value> {
    let n = match op {
        OpCode::Subtract => a - b,
        OpCode::Multiply => {
            if !a.is_zero() && !b.is_zero() {
                // The product has at least bits(a) + bits(b) - 1 bits.
                check_size((a.bits() + b.bits()).saturating_sub(1))?;
            }
            a * b
        }
        OpCode::Divide => {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            a / b
        }
        OpCode::Modulo => {
            if b.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            a % b
        }
        OpCode::Power => {
            let exponent = b.to_u32().ok_or(RuntimeError::InvalidExponent)?;
            // |a| >= 2 gives at least (bits(a) - 1) * exponent bits.
            check_size(a.bits().saturating_sub(1).saturating_mul(u64::from(exponent)))?;
            a.pow(exponent)
        }
        OpCode::BitAnd => a & b,
        OpCode::BitOr => a | b,
        OpCode::BitXor => a ^ b,
        OpCode::ShiftLeft => {
            let shift = shift_amount(&b)?;
            if !a.is_zero() {
                check_size(a.bits() + u64::from(shift))?;
            }
            a << shift
        }
        OpCode::ShiftRight => a >> shift_amount(&b)?,
        OpCode::Greater => return Ok(Value::Bool(a > b)),
        OpCode::Less => return Ok(Value::Bool(a < b)),
        other => {
            return Err(RuntimeError::Internal(format!(
                "{} is not a binary numeric opcode",
                other.name()
            )));
        }
    };
    Ok(Value::Number(n))
}

fn check_size(bits: u64) -> Result<()> {
    if bits > MAX_NUMBER_BITS {
        return Err(RuntimeError::NumberTooLarge);
    }
    Ok(())
}

fn shift_amount(b: &BigInt) -> Result<u32> {
    b.to_u32().ok_or(RuntimeError::InvalidShift)
}
