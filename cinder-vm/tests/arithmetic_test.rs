// cinder-vm - Integer arithmetic tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for exact-integer arithmetic and its error paths.

#[macro_use]
mod common;

#[test]
fn precedence() {
    assert_prints!(
        "print 1 + 2 * 3; print (1 + 2) * 3; print 2 ** 3 ** 2; print -2 ** 2; print 2 * 3 ** 2;",
        ["7", "9", "64", "4", "36"]
    );
}

#[test]
fn exact_integer_operators() {
    assert_prints!(
        "print 3 ** 2; print ~5; print 5 << 1; print 7 / 2; print -7 / 2; print -7 % 3;",
        ["9", "-6", "10", "3", "-3", "-1"]
    );
}

#[test]
fn bitwise_operators() {
    assert_prints!(
        "print 12 & 10; print 12 | 10; print 12 ^ 10; print -16 >> 2;",
        ["8", "14", "6", "-4"]
    );
}

#[test]
fn numbers_grow_without_overflow() {
    assert_prints!(
        "print 9223372036854775807 + 1; print 2 ** 128;",
        [
            "9223372036854775808",
            "340282366920938463463374607431768211456"
        ]
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert_runtime_err!("print 1 / 0;", "Division by zero.");
    assert_runtime_err!("print 1 % 0;", "Division by zero.");
}

#[test]
fn negative_exponent_and_shift() {
    assert_runtime_err!(
        "print 2 ** -1;",
        "Exponent must be a non-negative 32-bit integer."
    );
    assert_runtime_err!(
        "print 1 << -1;",
        "Shift amount must be a non-negative 32-bit integer."
    );
}

#[test]
fn oversized_results_are_runtime_errors() {
    assert_runtime_err!("print 3 ** 3000000;", "Result exceeds the maximum number size.");
    assert_runtime_err!("print 1 << 4000000;", "Result exceeds the maximum number size.");
    assert_runtime_err!(
        "let big = 1 << 800000; print big * big;",
        "Result exceeds the maximum number size."
    );
    assert_prints!("print 1 ** 4000000; print 0 << 4000000;", ["1", "0"]);
}

#[test]
fn operand_type_errors() {
    assert_runtime_err!("print 1 - 'a';", "Operands must be numbers.");
    assert_runtime_err!("print 1 < 'a';", "Operands must be numbers.");
    assert_runtime_err!("print 1 + 'a';", "Operands must be two numbers or two strings.");
    assert_runtime_err!("print -'a';", "Operand must be a number.");
    assert_runtime_err!("print ~true;", "Operand must be a number.");
}
