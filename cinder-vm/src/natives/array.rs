// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The built-in `Array` class.
//!
//! An array instance keeps its elements in a raw array cell stored in the
//! const field `array`.

use std::cell::RefCell;
use std::rc::Rc;

use num_traits::ToPrimitive;

use super::{NativeClass, NativeError, NativeResult, arg};
use crate::object::{Instance, InstanceClass};
use crate::value::Value;

/// Name of the field holding the element cell.
pub const ARRAY_FIELD: &str = "array";

const NOT_AN_ARRAY: &str = "Object is not an instance of Array";

thread_local! {
    static ARRAY_CLASS: Rc<NativeClass> = Rc::new(build());
}

/// The shared `Array` class for this thread.
pub fn class() -> Rc<NativeClass> {
    ARRAY_CLASS.with(Rc::clone)
}

/// Create an `Array` instance holding `items`.
pub fn new_array(items: Vec<Value>) -> Value {
    let instance = Instance::new(InstanceClass::Native(class()));
    instance.define_const_field(ARRAY_FIELD, Value::Array(Rc::new(RefCell::new(items))));
    Value::Instance(Rc::new(instance))
}

/// The element cell of an `Array` instance.
pub fn elements(instance: &Instance) -> Result<Rc<RefCell<Vec<Value>>>, NativeError> {
    if instance.class_name() != "Array" {
        return Err(NativeError::new(NOT_AN_ARRAY));
    }
    match instance.get_field(ARRAY_FIELD) {
        Some(Value::Array(cell)) => Ok(cell),
        _ => Err(NativeError::new(NOT_AN_ARRAY)),
    }
}

/// Validate an index argument against the current length.
fn index(value: &Value, len: usize) -> Result<usize, NativeError> {
    let Value::Number(n) = value else {
        return Err(NativeError::new(format!("Index {} is not number.", value)));
    };
    match n.to_usize() {
        Some(i) if i < len => Ok(i),
        _ => Err(NativeError::new(format!("Out of bound {}.", n))),
    }
}

fn build() -> NativeClass {
    NativeClass::new("Array")
        .with_method("constructor", |_vm, this, args| {
            if this.class_name() != "Array" {
                return Err(NativeError::new(NOT_AN_ARRAY));
            }
            this.define_const_field(
                ARRAY_FIELD,
                Value::Array(Rc::new(RefCell::new(args.to_vec()))),
            );
            Ok(Value::Null)
        })
        .with_method("get", |_vm, this, args| get(this, &arg(args, 0)))
        .with_method("set", |_vm, this, args| {
            set(this, &arg(args, 0), arg(args, 1))
        })
        .with_method("push", |_vm, this, args| {
            elements(this)?.borrow_mut().push(arg(args, 0));
            Ok(Value::Null)
        })
        .with_method("pop", |_vm, this, _args| {
            Ok(elements(this)?.borrow_mut().pop().unwrap_or(Value::Null))
        })
        .with_method("unshift", |_vm, this, args| {
            elements(this)?.borrow_mut().insert(0, arg(args, 0));
            Ok(Value::Null)
        })
        .with_method("shift", |_vm, this, _args| {
            let cell = elements(this)?;
            let mut items = cell.borrow_mut();
            if items.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(items.remove(0))
            }
        })
        .with_method("clear", |_vm, this, _args| {
            elements(this)?.borrow_mut().clear();
            Ok(Value::Null)
        })
        .with_method("length", |_vm, this, _args| {
            Ok(Value::number(elements(this)?.borrow().len()))
        })
        .with_stringifier(stringify)
}

/// `get(i)`, shared with subscript reads.
fn get(this: &Instance, idx: &Value) -> NativeResult {
    let cell = elements(this)?;
    let items = cell.borrow();
    let i = index(idx, items.len())?;
    Ok(items[i].clone())
}

/// `set(i, v)`, shared with subscript writes.
fn set(this: &Instance, idx: &Value, value: Value) -> NativeResult {
    let cell = elements(this)?;
    let mut items = cell.borrow_mut();
    let i = index(idx, items.len())?;
    items[i] = value;
    Ok(Value::Null)
}

fn stringify(instance: &Instance) -> String {
    let Ok(cell) = elements(instance) else {
        return "Array []".to_string();
    };
    let items = cell.borrow();
    if items.is_empty() {
        return "Array []".to_string();
    }
    let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
    format!("Array [ {} ]", parts.join(", "))
}
