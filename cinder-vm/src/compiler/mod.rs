// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Single-pass bytecode compiler.
//!
//! Tokens are pulled from the lexer on demand and bytecode is emitted as the
//! parser walks them. There is no AST: expressions use a Pratt parser
//! (`rules`, `expressions`), statements use recursive descent (`statements`),
//! and variable references are resolved to locals, upvalues or globals as they
//! are encountered (`resolve`).

pub mod emit;
pub mod expressions;
pub mod resolve;
pub mod rules;
pub mod statements;
pub mod types;

use std::collections::HashSet;

use cinder_lexer::{Lexer, Token, TokenKind};
use log::{debug, log_enabled, trace};

use crate::chunk::{Function, UpvalueDescriptor};

pub use rules::Precedence;
pub use types::{
    ClassScope, CompileError, CompileErrors, ErrorLocation, FunctionKind, FunctionScope, Local,
    Result, UpvalueSlot,
};

/// Deepest combined nesting of statements and expressions the compiler
/// will descend into.
pub const MAX_NESTING: usize = 256;

/// Compile source text into the top-level script function.
///
/// Returns every diagnostic when compilation fails.
pub fn compile(source: &str) -> Result<Function> {
    let mut compiler = Compiler::new(source);
    compiler.advance();
    while !compiler.matches(TokenKind::Eof) {
        compiler.declaration();
    }
    let (function, _) = compiler.end_function();

    if compiler.errors.is_empty() {
        if log_enabled!(log::Level::Trace) {
            trace!("{}", function.disassemble());
        }
        Ok(function)
    } else {
        debug!("compile failed with {} error(s)", compiler.errors.len());
        Err(CompileErrors(compiler.errors))
    }
}

/// Parser state plus the stack of functions and classes being compiled.
pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    pub(crate) current: Token<'src>,
    pub(crate) previous: Token<'src>,
    pub(crate) errors: Vec<CompileError>,
    panic_mode: bool,

    /// Current statement and expression nesting.
    depth: usize,

    /// Set once nesting overflows. No further errors are reported.
    abandoned: bool,

    /// Innermost function last. Never empty while compiling.
    pub(crate) functions: Vec<FunctionScope<'src>>,

    /// Innermost class last.
    pub(crate) classes: Vec<ClassScope>,

    /// Globals declared `const` so far in this compilation.
    pub(crate) const_globals: HashSet<&'src str>,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        Compiler {
            lexer: Lexer::new(source),
            current: Token::placeholder(),
            previous: Token::placeholder(),
            errors: Vec::new(),
            panic_mode: false,
            depth: 0,
            abandoned: false,
            functions: vec![FunctionScope::new(FunctionKind::Script, None)],
            classes: Vec::new(),
            const_globals: HashSet::new(),
        }
    }

    // ========================================================================
    // Token Stream
    // ========================================================================

    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Report an error at the token just consumed.
    pub(crate) fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    /// Report an error at the token about to be consumed.
    pub(crate) fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode || self.abandoned {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Lexer,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.errors.push(CompileError {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    /// Skip tokens until a likely statement boundary.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Function
                | TokenKind::Let
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_NESTING`] the error
    /// is reported and the rest of the input is skipped without further
    /// diagnostics.
    pub(crate) fn nested(&mut self, message: &str, parse: impl FnOnce(&mut Self)) {
        if self.depth >= MAX_NESTING {
            self.error_at_current(message);
            self.abandoned = true;
            while !self.check(TokenKind::Eof) {
                self.advance();
            }
            return;
        }
        self.depth += 1;
        parse(self);
        self.depth -= 1;
    }

    pub(crate) fn in_panic(&self) -> bool {
        self.panic_mode
    }

    // ========================================================================
    // Function Scopes
    // ========================================================================

    #[inline]
    pub(crate) fn scope(&self) -> &FunctionScope<'src> {
        // The script scope is pushed in `new` and only popped by `compile`.
        &self.functions[self.functions.len() - 1]
    }

    #[inline]
    pub(crate) fn scope_mut(&mut self) -> &mut FunctionScope<'src> {
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    pub(crate) fn begin_function(&mut self, kind: FunctionKind, name: &str) {
        self.functions
            .push(FunctionScope::new(kind, Some(name.to_string())));
    }

    /// Finish the innermost function: emit its implicit return and pop its scope.
    pub(crate) fn end_function(&mut self) -> (Function, Vec<UpvalueSlot>) {
        self.emit_return();
        let scope = match self.functions.pop() {
            Some(scope) => scope,
            None => return (Function::default(), Vec::new()),
        };
        let mut function = scope.function;
        function.upvalues = scope
            .upvalues
            .iter()
            .map(|u| UpvalueDescriptor {
                index: u.index,
                is_local: u.is_local,
            })
            .collect();
        (function, scope.upvalues)
    }
}
