// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Primitives (`Null`, `Bool`, `Number`, `String`) compare by value. Every
//! heap object compares by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::chunk::Function;
use crate::natives::{NativeClass, NativeFunction};
use crate::object::{BoundMethod, Class, Closure, Instance};

/// A Cinder value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Arbitrary-precision integer.
    Number(BigInt),
    String(Rc<str>),
    /// Raw element storage behind an `Array` instance.
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Closure(Rc<Closure>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    BoundMethod(Rc<BoundMethod>),
    NativeFunction(Rc<NativeFunction>),
    NativeClass(Rc<NativeClass>),
}

impl Value {
    /// Construct a number from anything convertible into a `BigInt`.
    pub fn number(n: impl Into<BigInt>) -> Self {
        Value::Number(n.into())
    }

    /// Construct a string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// `null` and `false` are falsy; everything else is truthy.
    #[inline]
    pub fn is_falsy(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    /// The serialized type tag for this value.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "ObjNull",
            Value::Bool(_) => "ObjBool",
            Value::Number(_) => "ObjNumber",
            Value::String(_) => "ObjString",
            Value::Array(_) => "ObjArray",
            Value::Function(_) => "ObjFunction",
            Value::Closure(_) => "ObjClosure",
            Value::Class(_) => "ObjClass",
            Value::Instance(_) => "ObjInstance",
            Value::BoundMethod(_) => "ObjBoundMethod",
            Value::NativeFunction(_) => "ObjNativeFunction",
            Value::NativeClass(_) => "ObjNativeClass",
        }
    }

    pub fn as_number(&self) -> Option<&BigInt> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Rc<Instance>> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Address of the heap object, if any. Used for identity tracking.
    pub(crate) fn heap_addr(&self) -> Option<usize> {
        let addr = match self {
            Value::Array(a) => Rc::as_ptr(a) as *const () as usize,
            Value::Function(f) => Rc::as_ptr(f) as *const () as usize,
            Value::Closure(c) => Rc::as_ptr(c) as *const () as usize,
            Value::Class(c) => Rc::as_ptr(c) as *const () as usize,
            Value::Instance(i) => Rc::as_ptr(i) as *const () as usize,
            Value::BoundMethod(b) => Rc::as_ptr(b) as *const () as usize,
            Value::NativeFunction(n) => Rc::as_ptr(n) as *const () as usize,
            Value::NativeClass(n) => Rc::as_ptr(n) as *const () as usize,
            _ => return None,
        };
        Some(addr)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::NativeClass(a), Value::NativeClass(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(BigInt::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let addr = Rc::as_ptr(items) as *const () as usize;
                f.write_str(&render_guarded(addr, "[...]", || {
                    let parts: Vec<String> =
                        items.borrow().iter().map(|item| item.to_string()).collect();
                    format!("[{}]", parts.join(", "))
                }))
            }
            Value::Function(func) => write!(f, "<function {}>", func.display_name()),
            Value::Closure(c) => write!(f, "<closure {}>", c.function.display_name()),
            Value::Class(c) => write!(f, "<class {}>", c.name),
            Value::Instance(inst) => f.write_str(&inst.to_display_string()),
            Value::BoundMethod(b) => {
                write!(f, "<boundmethod {}>", b.method.function.display_name())
            }
            Value::NativeFunction(n) => write!(f, "<nativefunction {}>", n.name),
            Value::NativeClass(n) => write!(f, "<nativeclass {}>", n.name),
        }
    }
}

// Containers may hold themselves. Each one being rendered is recorded here so
// that a repeat visit prints a placeholder instead of recursing.
thread_local! {
    static RENDERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Deepest container nesting rendered before falling back to the placeholder.
const MAX_RENDER_DEPTH: usize = 256;

struct RenderEntry;

impl Drop for RenderEntry {
    fn drop(&mut self) {
        RENDERING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Render the container at `addr` with `render`, or return `placeholder` if
/// it is already being rendered further up or nesting is too deep.
pub(crate) fn render_guarded(
    addr: usize,
    placeholder: &str,
    render: impl FnOnce() -> String,
) -> String {
    let entered = RENDERING.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.len() >= MAX_RENDER_DEPTH || stack.contains(&addr) {
            return false;
        }
        stack.push(addr);
        true
    });
    if !entered {
        return placeholder.to_string();
    }
    let _entry = RenderEntry;
    render()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsiness() {
        assert!(Value::Null.is_falsy());
        assert!(Value::Bool(false).is_falsy());
        assert!(!Value::Bool(true).is_falsy());
        assert!(!Value::number(0).is_falsy());
        assert!(!Value::string("").is_falsy());
    }

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Value::number(3), Value::number(3));
        assert_eq!(Value::string("ab"), Value::from("ab"));
        assert_ne!(Value::number(1), Value::string("1"));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_reference_equality_is_identity() {
        let a = Value::Array(Rc::new(RefCell::new(vec![Value::number(1)])));
        let b = Value::Array(Rc::new(RefCell::new(vec![Value::number(1)])));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::number(-42).to_string(), "-42");
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn test_display_big_number() {
        let n: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(Value::Number(n).to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_display_raw_array() {
        let a = Value::Array(Rc::new(RefCell::new(vec![
            Value::number(1),
            Value::string("x"),
        ])));
        assert_eq!(a.to_string(), "[1, x]");
    }

    #[test]
    fn test_display_raw_array_holding_itself() {
        let cell = Rc::new(RefCell::new(vec![Value::number(1)]));
        let a = Value::Array(cell.clone());
        cell.borrow_mut().push(a.clone());
        assert_eq!(a.to_string(), "[1, [...]]");
        // Rendering twice gives the same text; nothing is left on the guard.
        assert_eq!(a.to_string(), "[1, [...]]");
        cell.borrow_mut().clear();
    }

    #[test]
    fn test_display_stops_at_max_depth() {
        let mut v = Value::number(0);
        for _ in 0..MAX_RENDER_DEPTH + 10 {
            v = Value::Array(Rc::new(RefCell::new(vec![v])));
        }
        let text = v.to_string();
        assert!(text.starts_with("[[[["));
        assert!(text.contains("[...]"));
        assert!(!text.contains('0'));
    }

    #[test]
    fn test_display_functions() {
        let script = Rc::new(Function::new(None));
        assert_eq!(
            Value::Function(script.clone()).to_string(),
            "<function main script>"
        );
        let named = Rc::new(Function::new(Some("add".to_string())));
        assert_eq!(
            Value::Closure(Rc::new(Closure::new(named))).to_string(),
            "<closure add>"
        );
    }
}
