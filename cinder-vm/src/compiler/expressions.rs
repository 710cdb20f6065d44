// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Expression parsing and code generation.

use std::str::FromStr;

use cinder_lexer::TokenKind;
use num_bigint::BigInt;

use crate::opcode::OpCode;
use crate::value::Value;

use super::Compiler;
use super::resolve::Resolved;
use super::rules::{ParseFn, Precedence, rule};
use super::types::FunctionKind;

const MAX_ARGS: u8 = 255;

impl<'src> Compiler<'src> {
    pub(crate) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// Parse anything binding at least as tightly as `precedence`.
    pub(crate) fn parse_precedence(&mut self, precedence: Precedence) {
        self.nested("Expression nesting too deep.", |c| c.precedence_from(precedence));
    }

    fn precedence_from(&mut self, precedence: Precedence) {
        self.advance();
        if self.previous.kind == TokenKind::New {
            self.advance();
        }

        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        self.apply(prefix, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, handler: ParseFn, can_assign: bool) {
        match handler {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Call => self.call(),
            ParseFn::ArrayLiteral => self.array_literal(),
            ParseFn::Subscript => self.subscript(can_assign),
            ParseFn::MapLiteral => self.map_literal(),
            ParseFn::Dot => self.dot(can_assign),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::String => self.string(),
            ParseFn::Number => self.number(),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
            ParseFn::Literal => self.literal(),
            ParseFn::Super => self.super_(),
            ParseFn::This => self.this(),
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn number(&mut self) {
        match BigInt::from_str(self.previous.lexeme) {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let text = self.previous.lexeme;
        self.emit_constant(Value::string(text));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => self.emit_op(OpCode::Null),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    /// `[a, b, c]`
    fn array_literal(&mut self) {
        let mut count: usize = 0;
        if !self.check(TokenKind::RightBracket) {
            loop {
                self.expression();
                count += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBracket, "Expect ']' after array elements.");
        let count = self.literal_count(count, "Too many elements in array literal.");
        self.emit_op_u16(OpCode::ArrayInit, count);
    }

    /// `{ key: value, ... }`. Bare identifier keys are taken as strings.
    fn map_literal(&mut self) {
        let mut pairs: usize = 0;
        if !self.check(TokenKind::RightBrace) {
            loop {
                if self.matches(TokenKind::Identifier) {
                    let key = self.previous.lexeme;
                    self.emit_constant(Value::string(key));
                } else {
                    self.expression();
                }
                self.consume(TokenKind::Colon, "Expect ':' after map key.");
                self.expression();
                pairs += 1;
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after map entries.");
        let pairs = self.literal_count(pairs, "Too many entries in map literal.");
        self.emit_op_u16(OpCode::MapInit, pairs);
    }

    fn literal_count(&mut self, count: usize, message: &str) -> u16 {
        u16::try_from(count).unwrap_or_else(|_| {
            self.error(message);
            0
        })
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Tilde => self.emit_op(OpCode::BitNot),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::Percent => self.emit_op(OpCode::Modulo),
            TokenKind::StarStar => self.emit_op(OpCode::Power),
            TokenKind::Ampersand => self.emit_op(OpCode::BitAnd),
            TokenKind::Pipe => self.emit_op(OpCode::BitOr),
            TokenKind::Caret => self.emit_op(OpCode::BitXor),
            TokenKind::LessLess => self.emit_op(OpCode::ShiftLeft),
            TokenKind::GreaterGreater => self.emit_op(OpCode::ShiftRight),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => {}
        }
    }

    /// `a && b`: skip `b` when `a` is falsy, leaving `a` as the result.
    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    /// `a || b`: skip `b` when `a` is truthy, leaving `a` as the result.
    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    // ========================================================================
    // Calls & Access
    // ========================================================================

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit_op_u8(OpCode::Call, argc);
    }

    pub(crate) fn argument_list(&mut self) -> u8 {
        let mut argc: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == MAX_ARGS {
                    self.error("Cannot have more than 255 arguments.");
                } else {
                    argc += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        argc
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.previous.lexeme);

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_u16(OpCode::SetProperty, name);
        } else if self.matches(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.emit_op_u16(OpCode::Invoke, name);
            self.emit_byte(argc);
        } else {
            self.emit_op_u16(OpCode::GetProperty, name);
        }
    }

    fn subscript(&mut self, can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightBracket, "Expect ']' after index.");
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(OpCode::SubscriptSet);
        } else {
            self.emit_op(OpCode::SubscriptGet);
        }
    }

    // ========================================================================
    // Variables
    // ========================================================================

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    /// Emit a load of `name`, or a store when followed by `=` in assignable position.
    pub(crate) fn named_variable(&mut self, name: &str, can_assign: bool) {
        let resolved = self.resolve(name);

        if can_assign && self.matches(TokenKind::Equal) {
            let is_const = match resolved {
                Resolved::Local { is_const, .. }
                | Resolved::Upvalue { is_const, .. }
                | Resolved::Global { is_const } => is_const,
            };
            if is_const {
                self.error(&format!("Cannot reassign const {}", name));
            }
            self.expression();
            self.emit_store(resolved, name);
        } else {
            self.emit_load(resolved, name);
        }
    }

    fn emit_load(&mut self, resolved: Resolved, name: &str) {
        match resolved {
            Resolved::Local { slot, .. } => self.emit_op_u8(OpCode::GetLocal, slot),
            Resolved::Upvalue { index, .. } => self.emit_op_u8(OpCode::GetUpvalue, index),
            Resolved::Global { .. } => {
                let idx = self.identifier_constant(name);
                self.emit_op_u16(OpCode::GetGlobal, idx);
            }
        }
    }

    fn emit_store(&mut self, resolved: Resolved, name: &str) {
        match resolved {
            Resolved::Local { slot, .. } => self.emit_op_u8(OpCode::SetLocal, slot),
            Resolved::Upvalue { index, .. } => self.emit_op_u8(OpCode::SetUpvalue, index),
            Resolved::Global { .. } => {
                let idx = self.identifier_constant(name);
                self.emit_op_u16(OpCode::SetGlobal, idx);
            }
        }
    }

    fn this(&mut self) {
        if self.classes.is_empty() {
            self.error("Cannot use 'this' outside of a class.");
            return;
        }
        self.named_variable("this", false);
    }

    fn super_(&mut self) {
        match self.classes.last() {
            None => self.error("Cannot use 'super' outside of a class."),
            Some(class) if !class.has_superclass => {
                self.error("Cannot use 'super' in a class with no superclass.")
            }
            Some(_) => {}
        }

        // `super(args)` forwards to the superclass constructor.
        if self.matches(TokenKind::LeftParen) {
            if self.scope().kind != FunctionKind::Initializer {
                self.error(
                    "Super calls are not permitted outside constructors or in nested functions inside constructors.",
                );
            }
            let name = self.identifier_constant("constructor");
            self.named_variable("this", false);
            let argc = self.argument_list();
            self.named_variable("super", false);
            self.emit_op_u16(OpCode::SuperInvoke, name);
            self.emit_byte(argc);
            return;
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.identifier_constant(self.previous.lexeme);

        self.named_variable("this", false);
        if self.matches(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.named_variable("super", false);
            self.emit_op_u16(OpCode::SuperInvoke, name);
            self.emit_byte(argc);
        } else {
            self.named_variable("super", false);
            self.emit_op_u16(OpCode::GetSuper, name);
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
    fn test_literals_compile() {
        assert!(compile("print [1, 2, 3]; print {a: 1, 'b': 2, 3: 4}; print [];").is_ok());
    }

    #[test]
    fn test_new_is_ignored() {
        assert!(compile("class A {} let a = new A();").is_ok());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            first_message("print this;"),
            "Cannot use 'this' outside of a class."
        );
    }

    #[test]
    fn test_super_without_superclass() {
        assert_eq!(
            first_message("class A { m() { return super.m(); } }"),
            "Cannot use 'super' in a class with no superclass."
        );
    }

    #[test]
    fn test_super_call_outside_constructor() {
        assert_eq!(
            first_message("class A {} class B extends A { m() { super(); } }"),
            "Super calls are not permitted outside constructors or in nested functions inside constructors."
        );
    }

    #[test]
    fn test_super_call_in_constructor() {
        assert!(
            compile("class A { constructor(x) {} } class B extends A { constructor() { super(1); } }")
                .is_ok()
        );
    }

    #[test]
    fn test_missing_property_name() {
        assert_eq!(
            first_message("a.;"),
            "Expect property name after '.'."
        );
    }
}
