// cinder-lexer - Lexer for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the scanner.

use cinder_lexer::{Lexer, TokenKind};
use proptest::prelude::*;

proptest! {
    #[test]
    fn integer_literals_scan_as_one_number(n in any::<u64>()) {
        let source = n.to_string();
        let tokens = Lexer::new(&source).tokenize();
        prop_assert_eq!(tokens.len(), 1);
        prop_assert_eq!(tokens[0].kind, TokenKind::Number);
        prop_assert_eq!(tokens[0].lexeme, source.as_str());
    }

    #[test]
    fn words_scan_as_identifier_or_keyword(word in "[a-z_][a-z0-9_]{0,10}") {
        let tokens = Lexer::new(&word).tokenize();
        prop_assert_eq!(tokens.len(), 1);
        prop_assert_eq!(tokens[0].lexeme, word.as_str());
        prop_assert!(tokens[0].kind == TokenKind::Identifier || tokens[0].kind.is_keyword());
    }

    #[test]
    fn any_ascii_input_terminates_with_monotonic_lines(source in "[ -~\n\t]{0,64}") {
        let newlines = source.bytes().filter(|b| *b == b'\n').count() as u32;
        let mut lexer = Lexer::new(&source);
        let mut last_line = 1;
        // Each token consumes at least one byte, so this bound is never reached.
        for _ in 0..=source.len() {
            let token = lexer.scan_token();
            prop_assert!(token.line >= last_line);
            prop_assert!(token.line <= newlines + 1);
            last_line = token.line;
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        prop_assert_eq!(lexer.scan_token().kind, TokenKind::Eof);
    }
}
