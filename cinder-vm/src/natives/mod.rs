// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Host-provided functions and classes.
//!
//! Natives are synchronous. A native function receives the VM and its
//! arguments; a native method additionally receives the instance it was
//! invoked on. Both return `Result<Value, NativeError>`, and an error
//! surfaces as a runtime error with the message unchanged.

pub mod array;
pub mod map;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigInt;
use thiserror::Error;

use crate::object::Instance;
use crate::value::Value;
use crate::vm::{RuntimeError, Vm};

/// Error raised by a native function or method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// A failure reported by the native itself.
    #[error("{0}")]
    Message(String),

    /// An error from re-entering the VM, passed through unchanged so that
    /// statuses such as running out of gas survive the native boundary.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        NativeError::Message(message.into())
    }
}

pub type NativeResult = Result<Value, NativeError>;

/// Signature of a native function.
pub type NativeFn = dyn Fn(&mut Vm, &[Value]) -> NativeResult;

/// Signature of a native method. The receiver is passed explicitly.
pub type NativeMethod = dyn Fn(&mut Vm, &Rc<Instance>, &[Value]) -> NativeResult;

/// Renders an instance of a native class.
pub type Stringifier = dyn Fn(&Instance) -> String;

// ============================================================================
// Native Functions
// ============================================================================

/// A host function callable from scripts.
pub struct NativeFunction {
    pub name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Vm, &[Value]) -> NativeResult + 'static,
    {
        NativeFunction {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn call(&self, vm: &mut Vm, args: &[Value]) -> NativeResult {
        (self.func)(vm, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

// ============================================================================
// Native Classes
// ============================================================================

/// A host class: a name, a method table, and an optional stringifier.
///
/// Calling the class creates an instance and runs its `constructor` method
/// when one is registered.
pub struct NativeClass {
    pub name: String,
    methods: HashMap<String, Rc<NativeMethod>>,
    stringifier: Option<Box<Stringifier>>,
}

impl NativeClass {
    pub fn new(name: impl Into<String>) -> Self {
        NativeClass {
            name: name.into(),
            methods: HashMap::new(),
            stringifier: None,
        }
    }

    /// Add a method (builder style).
    pub fn with_method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(&mut Vm, &Rc<Instance>, &[Value]) -> NativeResult + 'static,
    {
        self.methods.insert(name.to_string(), Rc::new(method));
        self
    }

    /// Set how instances print (builder style).
    pub fn with_stringifier<F>(mut self, stringifier: F) -> Self
    where
        F: Fn(&Instance) -> String + 'static,
    {
        self.stringifier = Some(Box::new(stringifier));
        self
    }

    pub fn method(&self, name: &str) -> Option<Rc<NativeMethod>> {
        self.methods.get(name).cloned()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn stringify(&self, instance: &Instance) -> String {
        match &self.stringifier {
            Some(render) => render(instance),
            None => format!("<{} instance>", self.name),
        }
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("NativeClass")
            .field("name", &self.name)
            .field("methods", &names)
            .finish()
    }
}

// ============================================================================
// Standard Library
// ============================================================================

/// `clock()`: milliseconds since the Unix epoch.
pub fn clock() -> NativeFunction {
    NativeFunction::new("clock", |_vm, _args| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Ok(Value::Number(BigInt::from(millis)))
    })
}

/// First argument, or `null` when none was passed.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}
