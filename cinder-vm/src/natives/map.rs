// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The built-in `Map` class. Entries are the instance's own fields, keyed by
//! the text form of the key.

use std::rc::Rc;

use super::{NativeClass, NativeError, NativeResult, arg, array};
use crate::object::{Instance, InstanceClass};
use crate::value::Value;

const NOT_A_MAP: &str = "Object is not an instance of Map";

thread_local! {
    static MAP_CLASS: Rc<NativeClass> = Rc::new(build());
}

/// The shared `Map` class for this thread.
pub fn class() -> Rc<NativeClass> {
    MAP_CLASS.with(Rc::clone)
}

/// Create a `Map` instance from key/value pairs. Later duplicates win.
pub fn new_map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
    let entries = entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value));
    let instance = Instance::with_fields(InstanceClass::Native(class()), entries);
    Value::Instance(Rc::new(instance))
}

fn check(this: &Instance) -> Result<(), NativeError> {
    if this.class_name() == "Map" {
        Ok(())
    } else {
        Err(NativeError::new(NOT_A_MAP))
    }
}

fn build() -> NativeClass {
    NativeClass::new("Map")
        .with_method("set", |_vm, this, args| set(this, &arg(args, 0), arg(args, 1)))
        .with_method("get", |_vm, this, args| get(this, &arg(args, 0)))
        .with_method("has", |_vm, this, args| {
            check(this)?;
            Ok(Value::Bool(this.has_field(&arg(args, 0).to_string())))
        })
        .with_method("delete", |_vm, this, args| {
            check(this)?;
            Ok(Value::Bool(this.remove_field(&arg(args, 0).to_string())))
        })
        .with_method("clear", |_vm, this, _args| {
            check(this)?;
            this.clear_fields();
            Ok(Value::Null)
        })
        .with_method("size", |_vm, this, _args| {
            check(this)?;
            Ok(Value::number(this.field_count()))
        })
        .with_method("keys", |_vm, this, _args| {
            check(this)?;
            let keys = this.field_names().into_iter().map(Value::from).collect();
            Ok(array::new_array(keys))
        })
        .with_stringifier(stringify)
}

fn get(this: &Instance, key: &Value) -> NativeResult {
    check(this)?;
    let name = key.to_string();
    this.get_field(&name)
        .ok_or_else(|| NativeError::new(format!("Undefined property '{}'.", name)))
}

fn set(this: &Instance, key: &Value, value: Value) -> NativeResult {
    check(this)?;
    let name = key.to_string();
    this.set_field(&name, value)
        .map_err(|_| NativeError::new(format!("Cannot reassign const field '{}'.", name)))?;
    Ok(Value::Null)
}

fn stringify(instance: &Instance) -> String {
    let fields = instance.fields.borrow();
    if fields.is_empty() {
        return "Map {}".to_string();
    }
    let parts: Vec<String> = fields
        .iter()
        .map(|(k, f)| format!("{}: {}", k, f.value))
        .collect();
    format!("Map {{ {} }}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    fn invoke(vm: &mut Vm, target: &Value, name: &str, args: &[Value]) -> NativeResult {
        let inst = target.as_instance().unwrap().clone();
        let method = class().method(name).unwrap();
        method(vm, &inst, args)
    }

    #[test]
    fn test_keys_are_text_forms() {
        let mut vm = Vm::new();
        let m = new_map(vec![]);
        invoke(&mut vm, &m, "set", &[Value::number(1), Value::string("one")]).unwrap();
        assert_eq!(
            invoke(&mut vm, &m, "get", &[Value::string("1")]).unwrap(),
            Value::string("one")
        );
        assert_eq!(
            invoke(&mut vm, &m, "has", &[Value::number(1)]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_missing_key() {
        let mut vm = Vm::new();
        let m = new_map(vec![]);
        assert_eq!(
            invoke(&mut vm, &m, "get", &[Value::string("k")]),
            Err(NativeError::new("Undefined property 'k'."))
        );
    }

    #[test]
    fn test_delete_clear_size() {
        let mut vm = Vm::new();
        let m = new_map(vec![
            (Value::string("a"), Value::number(1)),
            (Value::string("b"), Value::number(2)),
        ]);
        assert_eq!(invoke(&mut vm, &m, "size", &[]).unwrap(), Value::number(2));
        assert_eq!(
            invoke(&mut vm, &m, "delete", &[Value::string("a")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            invoke(&mut vm, &m, "delete", &[Value::string("a")]).unwrap(),
            Value::Bool(false)
        );
        invoke(&mut vm, &m, "clear", &[]).unwrap();
        assert_eq!(invoke(&mut vm, &m, "size", &[]).unwrap(), Value::number(0));
    }

    #[test]
    fn test_display_in_insertion_order() {
        let m = new_map(vec![
            (Value::string("z"), Value::number(1)),
            (Value::string("a"), Value::string("x")),
        ]);
        assert_eq!(m.to_string(), "Map { z: 1, a: x }");
        assert_eq!(new_map(vec![]).to_string(), "Map {}");
    }

    #[test]
    fn test_new_map_duplicate_keys_keep_last_value() {
        let mut vm = Vm::new();
        let m = new_map(vec![
            (Value::number(1), Value::string("first")),
            (Value::string("b"), Value::Null),
            (Value::string("1"), Value::string("second")),
        ]);
        assert_eq!(m.to_string(), "Map { 1: second, b: null }");
        // Entries made this way are ordinary, writable fields.
        invoke(&mut vm, &m, "set", &[Value::number(1), Value::number(3)]).unwrap();
        assert_eq!(invoke(&mut vm, &m, "get", &[Value::number(1)]).unwrap(), Value::number(3));
    }

    #[test]
    fn test_keys_returns_array() {
        let mut vm = Vm::new();
        let m = new_map(vec![(Value::string("k"), Value::Null)]);
        let keys = invoke(&mut vm, &m, "keys", &[]).unwrap();
        assert_eq!(keys.to_string(), "Array [ k ]");
    }
}
