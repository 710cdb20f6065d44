// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable resolution: block scopes, locals and upvalue capture.

use crate::opcode::OpCode;

use super::Compiler;
use super::types::{Local, UpvalueSlot};

const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 256;

/// Where a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    Local { slot: u8, is_const: bool },
    Upvalue { index: u8, is_const: bool },
    Global { is_const: bool },
}

impl<'src> Compiler<'src> {
    // ========================================================================
    // Block Scopes
    // ========================================================================

    pub(crate) fn begin_scope(&mut self) {
        self.scope_mut().scope_depth += 1;
    }

    /// Leave a block, popping or closing every local declared in it.
    pub(crate) fn end_scope(&mut self) {
        let depth = {
            let scope = self.scope_mut();
            scope.scope_depth -= 1;
            scope.scope_depth
        };
        while let Some(local) = self.scope().locals.last() {
            if local.depth.is_some_and(|d| d <= depth) {
                break;
            }
            let op = if local.is_captured {
                OpCode::CloseUpvalue
            } else {
                OpCode::Pop
            };
            self.emit_op(op);
            self.scope_mut().locals.pop();
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub(crate) fn add_local(&mut self, name: &'src str, is_const: bool) {
        if self.scope().locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.scope_mut().locals.push(Local {
            name,
            depth: None,
            is_captured: false,
            is_const,
        });
    }

    /// Declare the identifier just consumed as a local of the current block.
    /// Globals are late-bound and need no declaration.
    pub(crate) fn declare_variable(&mut self, is_const: bool) {
        let scope = self.scope();
        if scope.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = scope.scope_depth;
        let duplicate = scope
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.is_none_or(|d| d >= depth))
            .any(|local| local.name == name);
        if duplicate {
            self.error("Variable with this name already declared in this scope.");
        }
        self.add_local(name, is_const);
    }

    /// Mark the newest local as usable.
    pub(crate) fn mark_initialized(&mut self) {
        let scope = self.scope_mut();
        if scope.scope_depth == 0 {
            return;
        }
        let depth = scope.scope_depth;
        if let Some(local) = scope.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a name in the innermost function: local, then upvalue, then global.
    pub(crate) fn resolve(&mut self, name: &str) -> Resolved {
        let innermost = self.functions.len() - 1;
        if let Some((slot, is_const)) = self.resolve_local(innermost, name) {
            return Resolved::Local { slot, is_const };
        }
        if let Some((index, is_const)) = self.resolve_upvalue(innermost, name) {
            return Resolved::Upvalue { index, is_const };
        }
        Resolved::Global {
            is_const: self.const_globals.contains(name),
        }
    }

    fn resolve_local(&mut self, function: usize, name: &str) -> Option<(u8, bool)> {
        let found = self.functions[function]
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth.is_none(), local.is_const));

        let (slot, uninitialized, is_const) = found?;
        if uninitialized {
            self.error("Cannot read local variable in its own initializer.");
        }
        // Locals are capped at MAX_LOCALS, so the slot fits in a byte.
        Some((slot as u8, is_const))
    }

    fn resolve_upvalue(&mut self, function: usize, name: &str) -> Option<(u8, bool)> {
        if function == 0 {
            return None;
        }
        let enclosing = function - 1;

        if let Some((slot, is_const)) = self.resolve_local(enclosing, name) {
            self.functions[enclosing].locals[slot as usize].is_captured = true;
            return Some((self.add_upvalue(function, slot, true, is_const), is_const));
        }

        if let Some((index, is_const)) = self.resolve_upvalue(enclosing, name) {
            return Some((self.add_upvalue(function, index, false, is_const), is_const));
        }

        None
    }

    /// Record a capture, reusing an identical one.
    fn add_upvalue(&mut self, function: usize, index: u8, is_local: bool, is_const: bool) -> u8 {
        let upvalues = &self.functions[function].upvalues;
        if let Some(existing) = upvalues
            .iter()
            .position(|u| u.index == index && u.is_local == is_local)
        {
            return existing as u8;
        }
        if upvalues.len() == MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        let upvalues = &mut self.functions[function].upvalues;
        upvalues.push(UpvalueSlot {
            index,
            is_local,
            is_const,
        });
        (upvalues.len() - 1) as u8
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;

    fn first_message(source: &str) -> String {
        compile(source).unwrap_err().0[0].message.clone()
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            first_message("{ let a = 1; let a = 2; }"),
            "Variable with this name already declared in this scope."
        );
    }

    #[test]
    fn test_shadowing_in_inner_block_allowed() {
        assert!(compile("{ let a = 1; { let a = 2; print a; } }").is_ok());
    }

    #[test]
    fn test_own_initializer() {
        assert_eq!(
            first_message("{ let a = a; }"),
            "Cannot read local variable in its own initializer."
        );
    }

    #[test]
    fn test_const_local_reassignment() {
        assert_eq!(
            first_message("{ const a = 1; a = 2; }"),
            "Cannot reassign const a"
        );
    }

    #[test]
    fn test_const_upvalue_reassignment() {
        assert_eq!(
            first_message("function f() { const a = 1; function g() { a = 2; } }"),
            "Cannot reassign const a"
        );
    }

    #[test]
    fn test_const_global_reassignment() {
        assert_eq!(first_message("const a = 1; a = 2;"), "Cannot reassign const a");
    }

    #[test]
    fn test_too_many_locals() {
        let decls: String = (0..256).map(|i| format!("let v{} = {};", i, i)).collect();
        let source = format!("{{ {} }}", decls);
        assert_eq!(first_message(&source), "Too many local variables in function.");
    }
}
