// cinder-lexer - Lexer for Cinder
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (scanner) for Cinder source code.
//!
//! Tokens are produced on demand by [`Lexer::scan_token`]. Invalid input never
//! aborts the scan: an [`TokenKind::Error`] token carrying the message is returned
//! and scanning continues with the next character, so the compiler can report
//! several errors from one pass.

use crate::token::{Token, TokenKind};

/// Message for a string literal that runs off the end of the input.
pub const UNTERMINATED_STRING: &str = "Unterminated string.";

/// Message for a character that starts no token.
pub const UNEXPECTED_CHARACTER: &str = "Unexpected character.";

/// The lexer converts source code into tokens.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the next token.
    ///
    /// Once the input is exhausted this keeps returning [`TokenKind::Eof`].
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.start = self.current;

        let c = match self.advance() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b'[' => self.make_token(TokenKind::LeftBracket),
            b']' => self.make_token(TokenKind::RightBracket),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b';' => self.make_token(TokenKind::Semicolon),
            b':' => self.make_token(TokenKind::Colon),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b'/' => self.make_token(TokenKind::Slash),
            b'%' => self.make_token(TokenKind::Percent),
            b'^' => self.make_token(TokenKind::Caret),
            b'~' => self.make_token(TokenKind::Tilde),
            b'*' => self.pair(b'*', TokenKind::StarStar, TokenKind::Star),
            b'!' => self.pair(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.pair(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'&' => self.pair(b'&', TokenKind::AmpAmp, TokenKind::Ampersand),
            b'|' => self.pair(b'|', TokenKind::PipePipe, TokenKind::Pipe),
            b'<' => {
                if self.matches(b'=') {
                    self.make_token(TokenKind::LessEqual)
                } else if self.matches(b'<') {
                    self.make_token(TokenKind::LessLess)
                } else {
                    self.make_token(TokenKind::Less)
                }
            }
            b'>' => {
                if self.matches(b'=') {
                    self.make_token(TokenKind::GreaterEqual)
                } else if self.matches(b'>') {
                    self.make_token(TokenKind::GreaterGreater)
                } else {
                    self.make_token(TokenKind::Greater)
                }
            }
            b'"' | b'\'' => self.string(c),
            _ => {
                // Step over the whole character so later slices stay on char boundaries.
                while !self.source.is_char_boundary(self.current) {
                    self.current += 1;
                }
                self.error_token(UNEXPECTED_CHARACTER)
            }
        }
    }

    /// Collect every token up to (not including) end of input.
    pub fn tokenize(&mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    /// Get the current line number (1-indexed).
    pub fn line(&self) -> u32 {
        self.line
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.current + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn pair(&mut self, second: u8, double: TokenKind, single: TokenKind) -> Token<'src> {
        if self.matches(second) {
            self.make_token(double)
        } else {
            self.make_token(single)
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token::new(kind, &self.source[self.start..self.current], self.line)
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token::new(TokenKind::Error, message, self.line)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\r' | b'\t' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while !matches!(self.peek(), Some(b'\n') | None) {
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    self.current += 2;
                    // An unterminated block comment swallows the rest of the input.
                    loop {
                        match self.advance() {
                            None => break,
                            Some(b'*') if self.peek() == Some(b'/') => {
                                self.current += 1;
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn string(&mut self, quote: u8) -> Token<'src> {
        // Lines are counted at the token's start, not where it ends.
        let line = self.line;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token(UNTERMINATED_STRING);
        }

        // Closing quote.
        self.current += 1;
        Token::new(
            TokenKind::String,
            &self.source[self.start + 1..self.current - 1],
            line,
        )
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
        }
        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| is_alpha(c) || c.is_ascii_digit()) {
            self.current += 1;
        }
        let kind = self.identifier_kind();
        self.make_token(kind)
    }

    /// Classify the current lexeme as a keyword or identifier by prefix.
    fn identifier_kind(&self) -> TokenKind {
        let word = &self.bytes[self.start..self.current];
        match word[0] {
            b'c' if word.len() > 1 => match word[1] {
                b'l' => check_keyword(word, 2, b"ass", TokenKind::Class),
                b'o' => check_keyword(word, 2, b"nst", TokenKind::Const),
                _ => TokenKind::Identifier,
            },
            b'd' => check_keyword(word, 1, b"o", TokenKind::Do),
            b'e' if word.len() > 1 => match word[1] {
                b'l' => check_keyword(word, 2, b"se", TokenKind::Else),
                b'x' => check_keyword(word, 2, b"tends", TokenKind::Extends),
                _ => TokenKind::Identifier,
            },
            b'f' if word.len() > 1 => match word[1] {
                b'a' => check_keyword(word, 2, b"lse", TokenKind::False),
                b'o' => check_keyword(word, 2, b"r", TokenKind::For),
                b'u' => check_keyword(word, 2, b"nction", TokenKind::Function),
                _ => TokenKind::Identifier,
            },
            b'i' => check_keyword(word, 1, b"f", TokenKind::If),
            b'l' => check_keyword(word, 1, b"et", TokenKind::Let),
            b'n' if word.len() > 1 => match word[1] {
                b'e' => check_keyword(word, 2, b"w", TokenKind::New),
                b'u' => check_keyword(word, 2, b"ll", TokenKind::Null),
                _ => TokenKind::Identifier,
            },
            b'p' => check_keyword(word, 1, b"rint", TokenKind::Print),
            b'r' => check_keyword(word, 1, b"eturn", TokenKind::Return),
            b's' => check_keyword(word, 1, b"uper", TokenKind::Super),
            b't' if word.len() > 1 => match word[1] {
                b'h' => check_keyword(word, 2, b"is", TokenKind::This),
                b'r' => check_keyword(word, 2, b"ue", TokenKind::True),
                _ => TokenKind::Identifier,
            },
            b'w' => check_keyword(word, 1, b"hile", TokenKind::While),
            _ => TokenKind::Identifier,
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.scan_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

fn check_keyword(word: &[u8], start: usize, rest: &[u8], kind: TokenKind) -> TokenKind {
    if word.len() == start + rest.len() && &word[start..] == rest {
        kind
    } else {
        TokenKind::Identifier
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        Lexer::new(s).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            kinds("(){}[],.;:"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Semicolon,
                TokenKind::Colon,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("- + / * ** % ^ ~ ! != = == > >= >> < <= << & && | ||"),
            vec![
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::StarStar,
                TokenKind::Percent,
                TokenKind::Caret,
                TokenKind::Tilde,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::GreaterGreater,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::LessLess,
                TokenKind::Ampersand,
                TokenKind::AmpAmp,
                TokenKind::Pipe,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds(
                "class const do else extends false for function if let new null print return super this true while"
            ),
            vec![
                TokenKind::Class,
                TokenKind::Const,
                TokenKind::Do,
                TokenKind::Else,
                TokenKind::Extends,
                TokenKind::False,
                TokenKind::For,
                TokenKind::Function,
                TokenKind::If,
                TokenKind::Let,
                TokenKind::New,
                TokenKind::Null,
                TokenKind::Print,
                TokenKind::Return,
                TokenKind::Super,
                TokenKind::This,
                TokenKind::True,
                TokenKind::While,
            ]
        );
    }

    #[test]
    fn test_keyword_prefixes_are_identifiers() {
        let tokens = Lexer::new("classy c constant doit fn functions thistle _let").tokenize();
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].lexeme, "classy");
        assert_eq!(tokens[7].lexeme, "_let");
    }

    #[test]
    fn test_numbers_and_identifiers() {
        let tokens = Lexer::new("123 abc_1 4").tokenize();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "abc_1");
        assert_eq!(tokens[2].lexeme, "4");
    }

    #[test]
    fn test_strings_both_quotes() {
        let tokens = Lexer::new(r#""double" 'single' "it's""#).tokenize();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::String));
        assert_eq!(tokens[0].lexeme, "double");
        assert_eq!(tokens[1].lexeme, "single");
        assert_eq!(tokens[2].lexeme, "it's");
    }

    #[test]
    fn test_multiline_string_keeps_start_line() {
        let mut lexer = Lexer::new("\"a\nb\" x");
        let s = lexer.scan_token();
        assert_eq!(s.kind, TokenKind::String);
        assert_eq!(s.lexeme, "a\nb");
        assert_eq!(s.line, 1);
        let x = lexer.scan_token();
        assert_eq!(x.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("'abc").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, UNTERMINATED_STRING);
    }

    #[test]
    fn test_unexpected_character_continues() {
        let tokens = Lexer::new("a \\ b é c").tokenize();
        let k: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::Identifier,
                TokenKind::Error,
                TokenKind::Identifier,
                TokenKind::Error,
                TokenKind::Identifier,
            ]
        );
        assert_eq!(tokens[1].lexeme, UNEXPECTED_CHARACTER);
    }

    #[test]
    fn test_comments_and_lines() {
        let src = "// line comment\n/* block\ncomment */ a\n/* unterminated";
        let tokens = Lexer::new(src).tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme, "a");
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.scan_token().kind, TokenKind::Identifier);
        assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
        assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_iterator() {
        let count = Lexer::new("let a = 1;").count();
        assert_eq!(count, 5);
    }
}
