// cinder-vm - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for the cinder-vm integration tests.
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

pub use cinder_vm::{
    GasCosts, InterpretResult, InterpretStatus, SharedBuffer, Value, Vm, VmConfig, compile,
};

/// A finished run: the structured result plus everything printed.
pub struct Run {
    pub result: InterpretResult,
    pub output: String,
}

/// Run `source` in a fresh VM, capturing printed output.
pub fn run(source: &str) -> Run {
    run_with(&mut Vm::new(), source, None)
}

/// Run `source` in an existing VM.
pub fn run_with(vm: &mut Vm, source: &str, gas_budget: Option<u64>) -> Run {
    let buffer = SharedBuffer::new();
    vm.set_output(Box::new(buffer.clone()));
    let result = vm.interpret(source, gas_budget);
    Run {
        result,
        output: buffer.contents(),
    }
}

/// Run `source` and return its output, panicking on any failure.
#[must_use]
pub fn output_of(source: &str) -> String {
    let run = run(source);
    assert!(
        run.result.is_ok(),
        "expected success for {:?}, got {:?}",
        source,
        run.result.diagnostics()
    );
    run.output
}

/// Run `source` and return the runtime error message, panicking on anything else.
#[must_use]
pub fn runtime_error(source: &str) -> String {
    let run = run(source);
    assert_eq!(
        run.result.status,
        InterpretStatus::RuntimeError,
        "expected a runtime error for {:?}, got {:?}",
        source,
        run.result.diagnostics()
    );
    run.result
        .runtime_error
        .map(|d| d.message())
        .unwrap_or_default()
}

/// Compile `source` and return its rendered diagnostics, panicking if it compiles.
#[must_use]
pub fn compile_errors(source: &str) -> Vec<String> {
    match compile(source) {
        Ok(_) => panic!("expected a compile error for {:?}", source),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

/// Assert that a program prints the given lines.
#[macro_export]
macro_rules! assert_prints {
    ($src:expr, [$($line:expr),* $(,)?]) => {{
        let expected: Vec<&str> = vec![$($line),*];
        let output = $crate::common::output_of($src);
        let actual: Vec<&str> = output.lines().collect();
        assert_eq!(actual, expected, "output of {:?}", $src);
    }};
}

/// Assert that a program fails at runtime with exactly this message.
#[macro_export]
macro_rules! assert_runtime_err {
    ($src:expr, $msg:expr) => {{
        assert_eq!($crate::common::runtime_error($src), $msg, "source: {:?}", $src);
    }};
}

/// Assert that the first compile error contains the given text.
#[macro_export]
macro_rules! assert_compile_err {
    ($src:expr, $msg:expr) => {{
        let errors = $crate::common::compile_errors($src);
        assert!(
            errors.iter().any(|e| e.contains($msg)),
            "expected a compile error containing {:?}, got {:?}",
            $msg,
            errors
        );
    }};
}
