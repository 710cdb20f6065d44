// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

use thiserror::Error;

use crate::natives::NativeError;

/// Runtime error during VM execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Exponent must be a non-negative 32-bit integer.")]
    InvalidExponent,

    #[error("Shift amount must be a non-negative 32-bit integer.")]
    InvalidShift,

    #[error("Result exceeds the maximum number size.")]
    NumberTooLarge,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Only instances have properties.")]
    PropertyOnNonInstance,

    #[error("Only instances have fields.")]
    FieldOnNonInstance,

    #[error("Only instances have methods.")]
    MethodOnNonInstance,

    #[error("Only instances of native classes support subscripts.")]
    NotSubscriptable,

    #[error("Cannot reassign const {0}")]
    ConstGlobal(String),

    #[error("Cannot reassign const field '{0}'.")]
    ConstField(String),

    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Superclass must be a class.")]
    SuperclassNotClass,

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Stack underflow.")]
    StackUnderflow,

    /// Raised by a native function or method; the message is shown unchanged.
    #[error("{0}")]
    Native(String),

    #[error("Failed to write output: {0}")]
    Output(String),

    /// The gas budget ran out. Reported as a status rather than a diagnostic.
    #[error("Out of gas.")]
    OutOfGas,

    /// Malformed bytecode or a broken VM invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NativeError> for RuntimeError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Message(message) => RuntimeError::Native(message),
            NativeError::Runtime(inner) => inner,
        }
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// One active call frame at the time of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub line: u32,
    /// `None` for the top-level script.
    pub function: Option<String>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "[line {}] in {}()", self.line, name),
            None => write!(f, "[line {}] in main script", self.line),
        }
    }
}

/// A runtime error together with the call stack it unwound, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RuntimeDiagnostic {
    pub error: RuntimeError,
    pub trace: Vec<TraceFrame>,
}

impl RuntimeDiagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for RuntimeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime exception: {}", self.error)?;
        for frame in &self.trace {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            RuntimeError::Arity {
                expected: 0,
                got: 2
            }
            .to_string(),
            "Expected 0 arguments but got 2."
        );
        assert_eq!(
            RuntimeError::ConstGlobal("x".to_string()).to_string(),
            "Cannot reassign const x"
        );
        assert_eq!(
            RuntimeError::ConstField("x".to_string()).to_string(),
            "Cannot reassign const field 'x'."
        );
        assert_eq!(
            RuntimeError::from(NativeError::new("Out of bound 3.")).to_string(),
            "Out of bound 3."
        );
    }

    #[test]
    fn test_diagnostic_rendering() {
        let diag = RuntimeDiagnostic {
            error: RuntimeError::DivisionByZero,
            trace: vec![
                TraceFrame {
                    line: 2,
                    function: Some("divide".to_string()),
                },
                TraceFrame {
                    line: 5,
                    function: None,
                },
            ],
        };
        assert_eq!(
            diag.to_string(),
            "runtime exception: Division by zero.\n[line 2] in divide()\n[line 5] in main script"
        );
    }
}
