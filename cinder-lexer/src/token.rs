// cinder-lexer - Token definitions for Cinder
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tokens produced by the scanner.

use std::fmt;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Dot,          // .
    Semicolon,    // ;
    Colon,        // :

    // Operators
    Minus,          // -
    Plus,           // +
    Slash,          // /
    Star,           // *
    StarStar,       // **
    Percent,        // %
    Caret,          // ^
    Tilde,          // ~
    Bang,           // !
    BangEqual,      // !=
    Equal,          // =
    EqualEqual,     // ==
    Greater,        // >
    GreaterEqual,   // >=
    GreaterGreater, // >>
    Less,           // <
    LessEqual,      // <=
    LessLess,       // <<
    Ampersand,      // &
    AmpAmp,         // &&
    Pipe,           // |
    PipePipe,       // ||

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    Class,
    Const,
    Do,
    Else,
    Extends,
    False,
    For,
    Function,
    If,
    Let,
    New,
    Null,
    Print,
    Return,
    Super,
    This,
    True,
    While,

    // Special
    Error,
    Eof,
}

impl TokenKind {
    /// Whether this kind is a reserved word.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Const
                | TokenKind::Do
                | TokenKind::Else
                | TokenKind::Extends
                | TokenKind::False
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Let
                | TokenKind::New
                | TokenKind::Null
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Super
                | TokenKind::This
                | TokenKind::True
                | TokenKind::While
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Minus => "-",
            TokenKind::Plus => "+",
            TokenKind::Slash => "/",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Bang => "!",
            TokenKind::BangEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::GreaterGreater => ">>",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::LessLess => "<<",
            TokenKind::Ampersand => "&",
            TokenKind::AmpAmp => "&&",
            TokenKind::Pipe => "|",
            TokenKind::PipePipe => "||",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Class => "class",
            TokenKind::Const => "const",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Extends => "extends",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Let => "let",
            TokenKind::New => "new",
            TokenKind::Null => "null",
            TokenKind::Print => "print",
            TokenKind::Return => "return",
            TokenKind::Super => "super",
            TokenKind::This => "this",
            TokenKind::True => "true",
            TokenKind::While => "while",
            TokenKind::Error => "error",
            TokenKind::Eof => "EOF",
        };
        f.write_str(text)
    }
}

/// A token: its kind, the slice of source it covers, and the line it starts on.
///
/// String tokens carry their contents without the surrounding quotes.
/// Error tokens carry the error message in `lexeme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, lexeme: &'src str, line: u32) -> Self {
        Token { kind, lexeme, line }
    }

    /// A placeholder used before the first token has been scanned.
    pub fn placeholder() -> Self {
        Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 1,
        }
    }
}
