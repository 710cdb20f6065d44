// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Heap objects: closures, upvalue cells, classes, instances and bound methods.
//!
//! Instances and closures drop their contents with an explicit worklist, so
//! a long chain of objects (a linked list built in a loop, say) is freed
//! without one native stack frame per link.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::chunk::Function;
use crate::natives::NativeClass;
use crate::value::{Value, render_guarded};

// ============================================================================
// Closures & Upvalues
// ============================================================================

/// A captured variable.
///
/// While the enclosing frame is live the cell is `Open` and names a stack
/// slot. When that slot goes out of scope the value moves into the cell.
#[derive(Debug, Clone)]
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

/// Shared handle to an upvalue cell.
pub type UpvalueRef = Rc<RefCell<Upvalue>>;

/// A function paired with the variables it captured.
#[derive(Debug)]
pub struct Closure {
    pub function: Rc<Function>,
    pub upvalues: Vec<UpvalueRef>,
}

impl Closure {
    /// A closure with no captures.
    pub fn new(function: Rc<Function>) -> Self {
        Closure {
            function,
            upvalues: Vec::new(),
        }
    }

    pub fn with_upvalues(function: Rc<Function>, upvalues: Vec<UpvalueRef>) -> Self {
        Closure { function, upvalues }
    }
}

// ============================================================================
// Classes
// ============================================================================

/// A script-defined class.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub methods: RefCell<HashMap<String, Rc<Closure>>>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Class {
            name: name.into(),
            methods: RefCell::new(HashMap::new()),
        }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Closure>> {
        self.methods.borrow().get(name).cloned()
    }
}

/// The class an instance was created from.
#[derive(Debug, Clone)]
pub enum InstanceClass {
    Script(Rc<Class>),
    Native(Rc<NativeClass>),
}

impl InstanceClass {
    pub fn name(&self) -> &str {
        match self {
            InstanceClass::Script(c) => &c.name,
            InstanceClass::Native(c) => &c.name,
        }
    }
}

/// An instance field. Const fields reject assignment.
#[derive(Debug, Clone)]
pub struct Field {
    pub value: Value,
    pub is_const: bool,
}

/// Returned when writing a field that was defined const.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstFieldError;

/// An object created by calling a class.
#[derive(Debug)]
pub struct Instance {
    pub class: InstanceClass,
    pub fields: RefCell<IndexMap<String, Field>>,
}

impl Instance {
    pub fn new(class: InstanceClass) -> Self {
        Instance {
            class,
            fields: RefCell::new(IndexMap::new()),
        }
    }

    /// An instance with the given non-const fields. A repeated name keeps its
    /// first position and its last value.
    pub fn with_fields(
        class: InstanceClass,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    Field {
                        value,
                        is_const: false,
                    },
                )
            })
            .collect();
        Instance {
            class,
            fields: RefCell::new(fields),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// The native class this instance belongs to, if any.
    pub fn native_class(&self) -> Option<&Rc<NativeClass>> {
        match &self.class {
            InstanceClass::Native(c) => Some(c),
            InstanceClass::Script(_) => None,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).map(|f| f.value.clone())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }

    /// Assign a field, creating it if absent.
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), ConstFieldError> {
        let mut fields = self.fields.borrow_mut();
        match fields.get_mut(name) {
            Some(field) if field.is_const => Err(ConstFieldError),
            Some(field) => {
                field.value = value;
                Ok(())
            }
            None => {
                fields.insert(
                    name.to_string(),
                    Field {
                        value,
                        is_const: false,
                    },
                );
                Ok(())
            }
        }
    }

    /// Define a const field, replacing any existing field of that name.
    pub fn define_const_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(
            name.to_string(),
            Field {
                value,
                is_const: true,
            },
        );
    }

    /// Remove a field. Returns whether it existed.
    pub fn remove_field(&self, name: &str) -> bool {
        self.fields.borrow_mut().shift_remove(name).is_some()
    }

    /// Remove every non-const field.
    pub fn clear_fields(&self) {
        self.fields.borrow_mut().retain(|_, f| f.is_const);
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn field_count(&self) -> usize {
        self.fields.borrow().len()
    }

    /// Text form: the native stringifier when one is registered, else `<Name instance>`.
    ///
    /// An instance reached again while it is still being rendered shows as
    /// `[...]` for arrays and `{...}` for anything else.
    pub fn to_display_string(&self) -> String {
        match &self.class {
            InstanceClass::Native(class) => {
                let placeholder = if class.name == "Array" { "[...]" } else { "{...}" };
                let addr = self as *const Instance as usize;
                render_guarded(addr, placeholder, || class.stringify(self))
            }
            InstanceClass::Script(class) => format!("<{} instance>", class.name),
        }
    }
}

/// A method closure bound to its receiver.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Rc<Closure>,
}

// ============================================================================
// Dropping
// ============================================================================

impl Drop for Instance {
    fn drop(&mut self) {
        let fields = std::mem::take(self.fields.get_mut());
        if fields.is_empty() {
            return;
        }
        drop_all(fields.into_iter().map(|(_, f)| f.value).collect());
    }
}

impl Drop for Closure {
    fn drop(&mut self) {
        if self.upvalues.is_empty() {
            return;
        }
        let mut pending = Vec::new();
        for cell in std::mem::take(&mut self.upvalues) {
            take_closed(cell, &mut pending);
        }
        drop_all(pending);
    }
}

fn drop_all(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        dismantle(value, &mut pending);
    }
}

/// Move what `value` refers to onto `pending` when this is its last
/// reference. The emptied object then drops without recursing.
fn dismantle(value: Value, pending: &mut Vec<Value>) {
    match value {
        Value::Instance(mut instance) => {
            if let Some(instance) = Rc::get_mut(&mut instance) {
                let fields = std::mem::take(instance.fields.get_mut());
                pending.extend(fields.into_iter().map(|(_, f)| f.value));
            }
        }
        Value::Array(mut items) => {
            if let Some(items) = Rc::get_mut(&mut items) {
                pending.append(items.get_mut());
            }
        }
        Value::Closure(mut closure) => {
            if let Some(closure) = Rc::get_mut(&mut closure) {
                for cell in std::mem::take(&mut closure.upvalues) {
                    take_closed(cell, pending);
                }
            }
        }
        Value::Class(mut class) => {
            if let Some(class) = Rc::get_mut(&mut class) {
                let methods = std::mem::take(class.methods.get_mut());
                pending.extend(methods.into_values().map(Value::Closure));
            }
        }
        Value::BoundMethod(bound) => {
            if let Ok(bound) = Rc::try_unwrap(bound) {
                pending.push(bound.receiver);
                pending.push(Value::Closure(bound.method));
            }
        }
        _ => {}
    }
}

fn take_closed(mut cell: UpvalueRef, pending: &mut Vec<Value>) {
    let Some(cell) = Rc::get_mut(&mut cell) else {
        return;
    };
    let taken = std::mem::replace(cell.get_mut(), Upvalue::Closed(Value::Null));
    if let Upvalue::Closed(value) = taken {
        pending.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Instance {
        Instance::new(InstanceClass::Script(Rc::new(Class::new("Point"))))
    }

    #[test]
    fn test_set_and_get_field() {
        let inst = point();
        assert!(inst.set_field("x", Value::number(1)).is_ok());
        assert_eq!(inst.get_field("x"), Some(Value::number(1)));
        assert_eq!(inst.get_field("y"), None);
    }

    #[test]
    fn test_const_field_rejects_assignment() {
        let inst = point();
        inst.define_const_field("id", Value::number(7));
        assert_eq!(inst.set_field("id", Value::number(8)), Err(ConstFieldError));
        assert_eq!(inst.get_field("id"), Some(Value::number(7)));
    }

    #[test]
    fn test_clear_keeps_const_fields() {
        let inst = point();
        inst.define_const_field("id", Value::number(1));
        inst.set_field("a", Value::Null).unwrap();
        inst.clear_fields();
        assert_eq!(inst.field_names(), vec!["id".to_string()]);
    }

    #[test]
    fn test_field_order_is_insertion_order() {
        let inst = point();
        for name in ["b", "a", "c"] {
            inst.set_field(name, Value::Null).unwrap();
        }
        assert!(inst.remove_field("a"));
        assert_eq!(inst.field_names(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_with_fields_keeps_first_position_and_last_value() {
        let class = InstanceClass::Script(Rc::new(Class::new("Point")));
        let inst = Instance::with_fields(
            class,
            vec![
                ("x".to_string(), Value::number(1)),
                ("y".to_string(), Value::number(2)),
                ("x".to_string(), Value::number(3)),
            ],
        );
        assert_eq!(inst.field_names(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(inst.get_field("x"), Some(Value::number(3)));
        assert!(inst.set_field("x", Value::Null).is_ok());
    }

    #[test]
    fn test_long_instance_chain_drops() {
        let class = Rc::new(Class::new("Node"));
        let mut head = Value::Null;
        for _ in 0..300_000 {
            let node = Instance::new(InstanceClass::Script(class.clone()));
            node.set_field("next", head).unwrap();
            head = Value::Instance(Rc::new(node));
        }
        drop(head);
        assert_eq!(Rc::strong_count(&class), 1);
    }

    #[test]
    fn test_long_closure_chain_drops() {
        let function = Rc::new(Function::new(Some("link".to_string())));
        let mut head = Value::Null;
        for _ in 0..300_000 {
            let cell = Rc::new(RefCell::new(Upvalue::Closed(head)));
            let closure = Closure::with_upvalues(function.clone(), vec![cell]);
            head = Value::Closure(Rc::new(closure));
        }
        drop(head);
        assert_eq!(Rc::strong_count(&function), 1);
    }

    #[test]
    fn test_shared_objects_survive_a_drop() {
        let class = Rc::new(Class::new("Box"));
        let shared = Value::Instance(Rc::new(Instance::new(InstanceClass::Script(
            class.clone(),
        ))));
        let holder = Instance::new(InstanceClass::Script(class));
        let list = Value::Array(Rc::new(RefCell::new(vec![shared.clone()])));
        holder.set_field("item", shared.clone()).unwrap();
        holder.set_field("list", list).unwrap();
        drop(holder);
        let Value::Instance(inner) = &shared else {
            panic!("expected an instance");
        };
        assert_eq!(Rc::strong_count(inner), 1);
    }

    #[test]
    fn test_script_instance_display() {
        assert_eq!(point().to_display_string(), "<Point instance>");
    }
}
