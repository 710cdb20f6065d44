// cinder-vm - Language behaviour tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! End-to-end tests for statements, scoping and control flow.

#[macro_use]
mod common;

use common::*;

// =============================================================================
// Statements & scoping
// =============================================================================

#[test]
fn print_literals() {
    assert_prints!(
        "print null; print true; print false; print 42; print 'text'; print \"dq\";",
        ["null", "true", "false", "42", "text", "dq"]
    );
}

#[test]
fn block_scoping_shadows_globals() {
    assert_prints!(
        "let a = 'global';
         {
           let a = 'outer';
           {
             let a = 'inner';
             print a;
           }
           print a;
         }
         print a;",
        ["inner", "outer", "global"]
    );
}

#[test]
fn uninitialised_let_is_null() {
    assert_prints!("let a; print a;", ["null"]);
}

#[test]
fn assignment_is_an_expression() {
    assert_prints!("let a; let b; a = b = 3; print a; print b;", ["3", "3"]);
}

#[test]
fn string_concatenation() {
    assert_prints!("print 'foo' + 'bar';", ["foobar"]);
}

#[test]
fn truthiness() {
    assert_prints!(
        "print !null; print !false; print !0; print !'';",
        ["true", "true", "false", "false"]
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_prints!(
        "print null || 'fallback'; print 1 && 2; print false && undefinedName;",
        ["fallback", "2", "false"]
    );
}

#[test]
fn equality_and_comparison() {
    assert_prints!(
        "print 1 == 1; print 1 != 2; print 'a' == 'a'; print 2 >= 2; print 3 <= 2; print null == false;",
        ["true", "true", "true", "true", "false", "false"]
    );
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_else() {
    assert_prints!(
        "if (1 < 2) print 'yes'; else print 'no';
         if (null) print 'yes'; else print 'no';",
        ["yes", "no"]
    );
}

#[test]
fn while_loop() {
    assert_prints!(
        "let i = 0; while (i < 3) { print i; i = i + 1; }",
        ["0", "1", "2"]
    );
}

#[test]
fn do_while_runs_body_once() {
    assert_prints!(
        "let i = 10; do { print i; i = i + 1; } while (i < 3);",
        ["10"]
    );
}

#[test]
fn for_loop() {
    assert_prints!(
        "for (let i = 0; i < 3; i = i + 1) print i;",
        ["0", "1", "2"]
    );
}

#[test]
fn for_loop_variable_is_scoped() {
    let run = run("for (let i = 0; i < 1; i = i + 1) {} print i;");
    assert_eq!(run.result.status, InterpretStatus::RuntimeError);
}

#[test]
fn recursion() {
    assert_prints!(
        "function fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
         print fib(20);",
        ["6765"]
    );
}

#[test]
fn fib_1000_is_exact_and_repeatable() {
    let source = "function fib(n) {
           let a = 0;
           let b = 1;
           for (let i = 0; i < n; i = i + 1) {
             let next = a + b;
             a = b;
             b = next;
           }
           return a;
         }
         print fib(1000);";
    let expected = "43466557686937456435688527675040625802564660517371780402481729089536555417949051890403879840079255169295922593080322634775209689623239873322471161642996440906533187938298969649928516003704476137795166849228875";
    assert_prints!(source, [expected]);
    // A second, independent VM produces the same digits.
    assert_eq!(output_of(source), format!("{}\n", expected));
}

#[test]
fn functions_print_their_names() {
    assert_prints!(
        "function hello() {} print hello; print clock;",
        ["<closure hello>", "<nativefunction clock>"]
    );
}

#[test]
fn new_keyword_is_optional() {
    assert_prints!(
        "class A { constructor(x) { this.x = x; } }
         print new A(1).x; print A(2).x;",
        ["1", "2"]
    );
}

// =============================================================================
// Globals across runs
// =============================================================================

#[test]
fn globals_survive_between_runs() {
    let mut vm = Vm::new();
    assert!(run_with(&mut vm, "let count = 1;", None).result.is_ok());
    let second = run_with(&mut vm, "count = count + 1; print count;", None);
    assert_eq!(second.output, "2\n");
}

#[test]
fn const_global_guarded_at_runtime_across_runs() {
    let mut vm = Vm::new();
    assert!(run_with(&mut vm, "const limit = 1;", None).result.is_ok());

    let assign = run_with(&mut vm, "limit = 2;", None);
    assert_eq!(assign.result.status, InterpretStatus::RuntimeError);
    assert_eq!(
        assign.result.runtime_error.unwrap().message(),
        "Cannot reassign const limit"
    );

    let redefine = run_with(&mut vm, "let limit = 3;", None);
    assert_eq!(redefine.result.status, InterpretStatus::RuntimeError);
    assert_eq!(vm.get_global("limit"), Some(Value::number(1)));
}

#[test]
fn host_globals_visible_to_scripts() {
    let mut vm = Vm::new();
    vm.set_global("greeting", Value::string("hi"));
    let run = run_with(&mut vm, "print greeting + '!';", None);
    assert_eq!(run.output, "hi!\n");
}

#[test]
fn natives_callable_from_scripts() {
    let mut vm = Vm::new();
    vm.define_native("double", |_vm, args| match args.first() {
        Some(Value::Number(n)) => Ok(Value::Number(n * 2)),
        _ => Err(cinder_vm::NativeError::new("double expects a number")),
    });
    let ok = run_with(&mut vm, "print double(21);", None);
    assert_eq!(ok.output, "42\n");

    let bad = run_with(&mut vm, "double('x');", None);
    assert_eq!(
        bad.result.runtime_error.unwrap().message(),
        "double expects a number"
    );
}
