// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pratt parser rule table.

use cinder_lexer::TokenKind;

/// Binding power, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // ||
    And,        // &&
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + - % ** & | ^ << >>
    Factor,     // * /
    Unary,      // ! - ~
    Call,       // . () []
    Primary,
}

impl Precedence {
    /// The next-higher level, used for left-associative operands.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// A parse handler, dispatched by `Compiler::apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFn {
    Grouping,
    Call,
    ArrayLiteral,
    Subscript,
    MapLiteral,
    Dot,
    Unary,
    Binary,
    Variable,
    String,
    Number,
    And,
    Or,
    Literal,
    Super,
    This,
}

/// Prefix handler, infix handler and infix precedence for one token kind.
#[derive(Debug, Clone, Copy)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

const fn rule_of(
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
) -> ParseRule {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

/// Look up the rule for a token kind.
pub fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn as F;
    use Precedence as P;
    use TokenKind as T;

    match kind {
        T::LeftParen => rule_of(Some(F::Grouping), Some(F::Call), P::Call),
        T::LeftBracket => rule_of(Some(F::ArrayLiteral), Some(F::Subscript), P::Call),
        T::LeftBrace => rule_of(Some(F::MapLiteral), None, P::None),
        T::Dot => rule_of(None, Some(F::Dot), P::Call),
        T::Minus => rule_of(Some(F::Unary), Some(F::Binary), P::Term),
        T::Plus
        | T::Percent
        | T::StarStar
        | T::Ampersand
        | T::Pipe
        | T::Caret
        | T::LessLess
        | T::GreaterGreater => rule_of(None, Some(F::Binary), P::Term),
        T::Slash | T::Star => rule_of(None, Some(F::Binary), P::Factor),
        T::Tilde | T::Bang => rule_of(Some(F::Unary), None, P::None),
        T::BangEqual | T::EqualEqual => rule_of(None, Some(F::Binary), P::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            rule_of(None, Some(F::Binary), P::Comparison)
        }
        T::AmpAmp => rule_of(None, Some(F::And), P::And),
        T::PipePipe => rule_of(None, Some(F::Or), P::Or),
        T::Identifier => rule_of(Some(F::Variable), None, P::None),
        T::String => rule_of(Some(F::String), None, P::None),
        T::Number => rule_of(Some(F::Number), None, P::None),
        T::True | T::False | T::Null => rule_of(Some(F::Literal), None, P::None),
        T::Super => rule_of(Some(F::Super), None, P::None),
        T::This => rule_of(Some(F::This), None, P::None),
        _ => rule_of(None, None, P::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Assignment < Precedence::Or);
        assert!(Precedence::Term < Precedence::Factor);
        assert!(Precedence::Call < Precedence::Primary);
        assert_eq!(Precedence::Term.next(), Precedence::Factor);
        assert_eq!(Precedence::Primary.next(), Precedence::Primary);
    }

    #[test]
    fn test_power_and_shift_share_term() {
        for kind in [TokenKind::StarStar, TokenKind::LessLess, TokenKind::Percent] {
            assert_eq!(rule(kind).precedence, Precedence::Term);
        }
        assert_eq!(rule(TokenKind::Star).precedence, Precedence::Factor);
    }

    #[test]
    fn test_non_operators_have_no_rule() {
        let r = rule(TokenKind::Semicolon);
        assert!(r.prefix.is_none() && r.infix.is_none());
        assert_eq!(r.precedence, Precedence::None);
    }
}
