// cinder-lexer - Lexer for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # cinder-lexer
//!
//! Scanner for the Cinder programming language.
//! Produces [`Token`]s on demand from a source string.

pub mod lexer;
pub mod token;

pub use lexer::{Lexer, UNEXPECTED_CHARACTER, UNTERMINATED_STRING};
pub use token::{Token, TokenKind};
