// cinder-vm - Closure and upvalue tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for closure capture, sharing and closing of upvalues.

#[macro_use]
mod common;

#[test]
fn counter_keeps_state() {
    assert_prints!(
        "function makeCounter() {
           let count = 0;
           function inc() { count = count + 1; return count; }
           return inc;
         }
         let c = makeCounter();
         print c(); print c(); print c();",
        ["1", "2", "3"]
    );
}

#[test]
fn counters_are_independent() {
    assert_prints!(
        "function makeCounter() {
           let count = 0;
           function inc() { count = count + 1; return count; }
           return inc;
         }
         let a = makeCounter();
         let b = makeCounter();
         a(); a();
         print a(); print b();",
        ["3", "1"]
    );
}

#[test]
fn sibling_closures_share_a_variable() {
    assert_prints!(
        "let get; let set;
         function make() {
           let value = 'before';
           function g() { return value; }
           function s(v) { value = v; }
           get = g; set = s;
         }
         make();
         set('after');
         print get();",
        ["after"]
    );
}

#[test]
fn closure_sees_later_writes_while_open() {
    assert_prints!(
        "function outer() {
           let x = 1;
           function read() { return x; }
           x = 2;
           return read;
         }
         print outer()();",
        ["2"]
    );
}

#[test]
fn block_scoped_capture_is_closed_at_block_exit() {
    assert_prints!(
        "let saved;
         {
           let local = 'captured';
           function f() { return local; }
           saved = f;
         }
         print saved();",
        ["captured"]
    );
}

#[test]
fn each_loop_iteration_body_gets_fresh_local() {
    assert_prints!(
        "let fns = [];
         for (let i = 0; i < 3; i = i + 1) {
           let j = i;
           function f() { return j; }
           fns.push(f);
         }
         print fns[0](); print fns[1](); print fns[2]();",
        ["0", "1", "2"]
    );
}

#[test]
fn nested_capture_through_two_levels() {
    assert_prints!(
        "function a() {
           let x = 'deep';
           function b() {
             function c() { return x; }
             return c;
           }
           return b();
         }
         print a()();",
        ["deep"]
    );
}

#[test]
fn closures_capture_parameters() {
    assert_prints!(
        "function adder(n) { function add(x) { return x + n; } return add; }
         let add5 = adder(5);
         print add5(10);",
        ["15"]
    );
}

#[test]
fn long_closure_chain_is_released() {
    assert_prints!(
        "function link(prev) { function get() { return prev; } return get; }
         let head = null;
         for (let i = 0; i < 300000; i = i + 1) head = link(head);
         head = null;
         print 'done';",
        ["done"]
    );
}
