// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Declarations and statements.

use std::rc::Rc;

use cinder_lexer::TokenKind;

use crate::opcode::OpCode;
use crate::value::Value;

use super::Compiler;
use super::types::{ClassScope, FunctionKind};

const MAX_PARAMS: u8 = 255;

impl<'src> Compiler<'src> {
    // ========================================================================
    // Declarations
    // ========================================================================

    pub(crate) fn declaration(&mut self) {
        self.nested("Statement nesting too deep.", Self::declaration_body);
    }

    fn declaration_body(&mut self) {
        if self.matches(TokenKind::Class) {
            self.class_declaration();
        } else if self.matches(TokenKind::Function) {
            self.function_declaration();
        } else if self.matches(TokenKind::Let) {
            self.var_declaration(false);
        } else if self.matches(TokenKind::Const) {
            self.var_declaration(true);
        } else {
            self.statement();
        }

        if self.in_panic() {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self, is_const: bool) {
        let global = self.parse_variable("Expect variable name.", is_const);

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            if is_const {
                self.error("Const declarations must be initialized.");
            }
            self.emit_op(OpCode::Null);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.define_variable(global, is_const);
    }

    /// Consume a variable name and declare it. Returns the name constant for globals.
    fn parse_variable(&mut self, message: &str, is_const: bool) -> u16 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable(is_const);
        if self.scope().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme;
        if is_const {
            self.const_globals.insert(name);
        }
        self.identifier_constant(name)
    }

    fn define_variable(&mut self, global: u16, is_const: bool) {
        if self.scope().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        let op = if is_const {
            OpCode::DefineConstGlobal
        } else {
            OpCode::DefineGlobal
        };
        self.emit_op_u16(op, global);
    }

    fn function_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.", false);
        // A function may refer to itself recursively.
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global, false);
    }

    /// Compile a function body (name already consumed) and emit its closure.
    fn function(&mut self, kind: FunctionKind) {
        let name = self.previous.lexeme;
        self.begin_function(kind, name);
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.scope().function.arity == MAX_PARAMS {
                    self.error_at_current("Cannot have more than 255 parameters.");
                } else {
                    self.scope_mut().function.arity += 1;
                }
                let param = self.parse_variable("Expect parameter name.", false);
                self.define_variable(param, false);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        // The scope is discarded whole, so no end_scope.
        let (function, _) = self.end_function();
        let idx = self.make_constant(Value::Function(Rc::new(function)));
        self.emit_op_u16(OpCode::Closure, idx);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous.lexeme;
        let name_constant = self.identifier_constant(class_name);
        self.declare_variable(false);

        self.emit_op_u16(OpCode::Class, name_constant);
        self.define_variable(name_constant, false);

        self.classes.push(ClassScope::default());

        if self.matches(TokenKind::Extends) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            let superclass = self.previous.lexeme;
            self.named_variable(superclass, false);
            if superclass == class_name {
                self.error("A class cannot inherit from itself.");
            }

            self.begin_scope();
            self.add_local("super", false);
            self.define_variable(0, false);

            self.named_variable(class_name, false);
            self.emit_op(OpCode::Inherit);
            if let Some(class) = self.classes.last_mut() {
                class.has_superclass = true;
            }
        }

        self.named_variable(class_name, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        let has_superclass = self.classes.pop().is_some_and(|c| c.has_superclass);
        if has_superclass {
            self.end_scope();
        }
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name = self.previous.lexeme;
        let constant = self.identifier_constant(name);
        let kind = if name == "constructor" {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };
        self.function(kind);
        self.emit_op_u16(OpCode::Method, constant);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub(crate) fn statement(&mut self) {
        self.nested("Statement nesting too deep.", Self::statement_body);
    }

    fn statement_body(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::Do) {
            self.do_while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().current_offset();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// `do body while (cond);` runs the body at least once.
    fn do_while_statement(&mut self) {
        let loop_start = self.chunk().current_offset();
        self.statement();

        self.consume(TokenKind::While, "Expect 'while' after do body.");
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");
        self.consume(TokenKind::Semicolon, "Expect ';' after do-while condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // No initializer.
        } else if self.matches(TokenKind::Let) {
            self.var_declaration(false);
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().current_offset();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk().current_offset();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.scope().kind == FunctionKind::Script {
            self.error("Cannot return from top-level code.");
        }

        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.scope().kind == FunctionKind::Initializer {
                self.error("Cannot return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;

    fn first_message(source: &str) -> String {
        compile(source).unwrap_err().0[0].message.clone()
    }

    #[test]
    fn test_control_flow_compiles() {
        let source = "
            let total = 0;
            for (let i = 0; i < 3; i = i + 1) { total = total + i; }
            while (total > 0) total = total - 1;
            do { total = total + 1; } while (total < 5);
            if (total == 5) print 'five'; else print 'other';
        ";
        assert!(compile(source).is_ok());
    }

    #[test]
    fn test_for_with_empty_clauses() {
        assert!(compile("for (;;) { }").is_ok());
    }

    #[test]
    fn test_const_requires_initializer() {
        assert_eq!(
            first_message("const a;"),
            "Const declarations must be initialized."
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            first_message("class A { constructor() { return 1; } }"),
            "Cannot return a value from an initializer."
        );
    }

    #[test]
    fn test_bare_return_in_initializer_allowed() {
        assert!(compile("class A { constructor() { return; } }").is_ok());
    }

    #[test]
    fn test_inherit_from_self() {
        assert_eq!(
            first_message("class A extends A {}"),
            "A class cannot inherit from itself."
        );
    }

    #[test]
    fn test_print_missing_semicolon() {
        assert_eq!(first_message("print 1"), "Expect ';' after value.");
    }
}
