// cinder-vm - Property-based tests for arithmetic
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests comparing VM arithmetic against `num-bigint`.
//!
//! Tests the following properties:
//! - Addition, subtraction and multiplication agree with BigInt
//! - Division truncates toward zero and modulo takes the dividend's sign
//! - `~x == -x - 1`
//! - Comparisons agree with Rust's ordering

mod common;

use common::output_of;
use proptest::prelude::*;

fn arb_int() -> impl Strategy<Value = i64> {
    any::<i64>()
}

fn arb_nonzero() -> impl Strategy<Value = i64> {
    prop_oneof![1i64..=i64::MAX, i64::MIN + 1..=-1i64]
}

/// Render an integer as a source expression. Negative literals parse as negation.
fn lit(n: i64) -> String {
    if n < 0 {
        format!("({})", n as i128)
    } else {
        n.to_string()
    }
}

fn eval(expr: &str) -> String {
    output_of(&format!("print {};", expr)).trim_end().to_string()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn add_sub_mul_match_bigint(a in arb_int(), b in arb_int()) {
        let (x, y) = (a as i128, b as i128);
        prop_assert_eq!(eval(&format!("{} + {}", lit(a), lit(b))), (x + y).to_string());
        prop_assert_eq!(eval(&format!("{} - {}", lit(a), lit(b))), (x - y).to_string());
        prop_assert_eq!(eval(&format!("{} * {}", lit(a), lit(b))), (x * y).to_string());
    }

    #[test]
    fn div_mod_truncate(a in arb_int(), b in arb_nonzero()) {
        let (x, y) = (a as i128, b as i128);
        prop_assert_eq!(eval(&format!("{} / {}", lit(a), lit(b))), (x / y).to_string());
        prop_assert_eq!(eval(&format!("{} % {}", lit(a), lit(b))), (x % y).to_string());
    }

    #[test]
    fn bit_not_is_negate_minus_one(a in arb_int()) {
        let x = a as i128;
        prop_assert_eq!(eval(&format!("~{}", lit(a))), (-x - 1).to_string());
    }

    #[test]
    fn comparisons_match(a in arb_int(), b in arb_int()) {
        prop_assert_eq!(eval(&format!("{} < {}", lit(a), lit(b))), (a < b).to_string());
        prop_assert_eq!(eval(&format!("{} == {}", lit(a), lit(b))), (a == b).to_string());
    }
}
