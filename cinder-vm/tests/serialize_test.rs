// cinder-vm - Bytecode serialization tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Round-trip tests: serialized bytecode must run exactly like the original.

mod common;

use std::rc::Rc;

use cinder_vm::serialize::{from_json, to_json};
use common::*;

fn run_function(function: cinder_vm::Function) -> Run {
    let mut vm = Vm::new();
    let buffer = SharedBuffer::new();
    vm.set_output(Box::new(buffer.clone()));
    let result = vm.interpret_function(Rc::new(function), None);
    Run {
        result,
        output: buffer.contents(),
    }
}

fn assert_round_trip(source: &str) {
    let direct = run_function(compile(source).unwrap());
    let json = to_json(&compile(source).unwrap()).unwrap();
    let restored = run_function(from_json(&json).unwrap());

    assert_eq!(direct.result.status, restored.result.status);
    assert_eq!(direct.output, restored.output);
    assert_eq!(
        direct.result.runtime_error.map(|e| e.to_string()),
        restored.result.runtime_error.map(|e| e.to_string())
    );
}

#[test]
fn round_trip_literals() {
    assert_round_trip("print null; print true; print 123456789012345678901234567890; print 'hi';");
}

#[test]
fn round_trip_nested_functions_and_closures() {
    assert_round_trip(
        "function outer(a) {
           let b = a * 2;
           function inner(c) { return a + b + c; }
           return inner;
         }
         print outer(1)(10);",
    );
}

#[test]
fn round_trip_control_flow() {
    assert_round_trip(
        "let s = '';
         for (let i = 0; i < 4; i = i + 1) { if (i % 2 == 0) s = s + 'e'; else s = s + 'o'; }
         do { s = s + '!'; } while (false);
         print s;",
    );
}

#[test]
fn round_trip_classes() {
    assert_round_trip(
        "class A { constructor(x) { this.x = x; } get() { return this.x; } }
         class B extends A { get() { return super.get() + 1; } }
         print B(41).get();",
    );
}

#[test]
fn round_trip_preserves_runtime_errors() {
    assert_round_trip("function f() { return 1 / 0; }\nf();");
}

#[test]
fn restored_function_keeps_shape() {
    let original = compile("function f(a, b) { return a; }").unwrap();
    let restored = from_json(&to_json(&original).unwrap()).unwrap();
    assert_eq!(restored.name, original.name);
    assert_eq!(restored.chunk.code, original.chunk.code);
    assert_eq!(restored.chunk.lines, original.chunk.lines);
    assert_eq!(restored.chunk.constants.len(), original.chunk.constants.len());
}
