// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the bytecode compiler.

use std::fmt;

use thiserror::Error;

use crate::chunk::Function;

/// Where in the source a compile error was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a token, shown by its lexeme.
    At(String),
    /// At end of input.
    End,
    /// A lexer error; the message already says what went wrong.
    Lexer,
}

/// A single compile diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::At(lexeme) => write!(f, " at {}", lexeme),
            ErrorLocation::End => f.write_str(" at end"),
            ErrorLocation::Lexer => Ok(()),
        }
    }
}

/// Every diagnostic from one failed compilation, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.0))]
pub struct CompileErrors(pub Vec<CompileError>);

fn render(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl CompileErrors {
    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first diagnostic's message, if any.
    pub fn first_message(&self) -> Option<&str> {
        self.0.first().map(|e| e.message.as_str())
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileErrors>;

/// What kind of function body is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Script,
    Function,
    Method,
    /// A method named `constructor`.
    Initializer,
}

/// Local variable during compilation.
#[derive(Debug, Clone)]
pub struct Local<'src> {
    pub name: &'src str,
    /// `None` while the initializer is still being compiled.
    pub depth: Option<usize>,
    pub is_captured: bool,
    pub is_const: bool,
}

/// A variable captured from an enclosing function.
#[derive(Debug, Clone, Copy)]
pub struct UpvalueSlot {
    /// Index in parent's locals (is_local=true) or parent's upvalues (is_local=false)
    pub index: u8,
    pub is_local: bool,
    pub is_const: bool,
}

/// Per-function compilation state. Innermost last on the compiler's stack.
#[derive(Debug)]
pub struct FunctionScope<'src> {
    pub function: Function,
    pub kind: FunctionKind,
    pub locals: Vec<Local<'src>>,
    pub upvalues: Vec<UpvalueSlot>,
    pub scope_depth: usize,
}

impl<'src> FunctionScope<'src> {
    pub fn new(kind: FunctionKind, name: Option<String>) -> Self {
        // Slot 0 holds the callee, or the receiver inside methods.
        let slot_zero = match kind {
            FunctionKind::Method | FunctionKind::Initializer => "this",
            FunctionKind::Script | FunctionKind::Function => "",
        };
        FunctionScope {
            function: Function::new(name),
            kind,
            locals: vec![Local {
                name: slot_zero,
                depth: Some(0),
                is_captured: false,
                is_const: false,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

/// Per-class compilation state, for validating `this` and `super`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassScope {
    pub has_superclass: bool,
}
