// cinder-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding Cinder.

use std::path::Path;

use cinder_vm::{
    CompileErrors, InterpretStatus, NativeClass, NativeResult, SharedBuffer, Value, Vm, VmConfig,
};

use crate::convert::{FromValue, IntoValue};
use crate::error::{EngineError, Result};

/// The Cinder scripting engine.
///
/// `Engine` wraps a [`Vm`], capturing everything scripts print and turning
/// interpreter statuses into `Result`s.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** Values use `Rc` and `RefCell`
/// internally. Create one `Engine` per thread.
///
/// # Example
///
/// ```rust
/// use cinder_embed::Engine;
///
/// let mut engine = Engine::new();
/// engine.eval("let answer = 6 * 7; print answer;").unwrap();
/// assert_eq!(engine.get_as::<i64>("answer"), Some(42));
/// assert_eq!(engine.take_output(), "42\n");
/// ```
pub struct Engine {
    vm: Vm,
    output: SharedBuffer,
    gas_budget: Option<u64>,
    gas_used: u64,
}

impl Engine {
    /// Create an Engine with the standard library and no gas metering.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut vm = Vm::with_config(config);
        let output = SharedBuffer::new();
        vm.set_output(Box::new(output.clone()));
        Engine {
            vm,
            output,
            gas_budget: None,
            gas_used: 0,
        }
    }

    /// Set the gas budget applied to every `eval`.
    ///
    /// Budgets only bite when the VM has a cost table; see [`VmConfig::gas_costs`].
    #[must_use]
    pub fn with_gas(mut self, budget: u64) -> Self {
        self.gas_budget = Some(budget);
        self
    }

    /// Gas used by the most recent `eval`.
    #[must_use]
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Compile and run a string of Cinder code.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code does not compile
    /// - Execution fails at runtime
    /// - The gas budget runs out
    pub fn eval(&mut self, source: &str) -> Result<()> {
        let result = self.vm.interpret(source, self.gas_budget);
        self.gas_used = result.gas_used;
        match result.status {
            InterpretStatus::Ok => Ok(()),
            InterpretStatus::CompileError => {
                Err(EngineError::Compile(CompileErrors(result.compile_errors)))
            }
            InterpretStatus::RuntimeError => match result.runtime_error {
                Some(diagnostic) => Err(EngineError::Runtime(diagnostic)),
                None => Err(EngineError::Call(cinder_vm::RuntimeError::Internal(
                    "runtime error without diagnostic".into(),
                ))),
            },
            InterpretStatus::OutOfGas => Err(EngineError::OutOfGas {
                used: result.gas_used,
            }),
        }
    }

    /// Read and run a file of Cinder code.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or as for [`Engine::eval`].
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.eval(&source)
    }

    /// Get a global.
    ///
    /// Returns `None` if the global is not defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.vm.get_global(name)
    }

    /// Get a typed global.
    ///
    /// Returns `None` if the global is not defined or cannot be converted.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Get a typed global with error details.
    ///
    /// Unlike `get_as`, this distinguishes between:
    /// - Global not found: returns `Ok(None)`
    /// - Conversion error: returns `Err(...)`
    pub fn try_get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(v) => T::from_value(&v).map(Some),
            None => Ok(None),
        }
    }

    /// Set a mutable global.
    ///
    /// # Errors
    ///
    /// Fails if the global is already bound as const.
    pub fn set(&mut self, name: &str, value: impl IntoValue) -> Result<()> {
        let outcome = self.vm.set_global(name, value.into_value());
        if outcome.rejected_because_const {
            return Err(EngineError::ConstGlobal(name.to_string()));
        }
        Ok(())
    }

    /// Bind a const global. Scripts cannot reassign it.
    ///
    /// # Errors
    ///
    /// Fails if the global is already bound as const.
    pub fn set_const(&mut self, name: &str, value: impl IntoValue) -> Result<()> {
        let outcome = self.vm.define_const_global(name, value.into_value());
        if outcome.rejected_because_const {
            return Err(EngineError::ConstGlobal(name.to_string()));
        }
        Ok(())
    }

    /// Call a global function, class or native by name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cinder_embed::{Engine, IntoValue};
    ///
    /// let mut engine = Engine::new();
    /// engine.eval("function add(a, b) { return a + b; }").unwrap();
    /// let sum = engine.call("add", &[1i64.into_value(), 2i64.into_value()]).unwrap();
    /// assert_eq!(sum.to_string(), "3");
    /// ```
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let callee = self
            .get(name)
            .ok_or_else(|| EngineError::UndefinedGlobal(name.to_string()))?;
        Ok(self.vm.call(&callee, args)?)
    }

    /// Call a global and convert the result.
    pub fn call_as<T: FromValue>(&mut self, name: &str, args: &[Value]) -> Result<T> {
        let value = self.call(name, args)?;
        T::from_value(&value)
    }

    /// Register a native Rust function as a global.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cinder_embed::{Engine, NativeError, Value};
    ///
    /// let mut engine = Engine::new();
    /// engine.register_native("greet", |args| match args.first() {
    ///     Some(Value::String(name)) => Ok(Value::string(format!("Hello, {}!", name))),
    ///     _ => Err(NativeError::new("greet expects a string")),
    /// });
    /// engine.eval("print greet('World');").unwrap();
    /// assert_eq!(engine.take_output(), "Hello, World!\n");
    /// ```
    pub fn register_native(
        &mut self,
        name: &str,
        func: impl Fn(&[Value]) -> NativeResult + 'static,
    ) {
        self.vm.define_native(name, move |_vm, args| func(args));
    }

    /// Register a native class as a global under its own name.
    pub fn register_class(&mut self, class: NativeClass) {
        self.vm.define_native_class(class);
    }

    /// Everything printed since the last `take_output`.
    #[must_use]
    pub fn output(&self) -> String {
        self.output.contents()
    }

    /// Return and clear everything printed so far.
    pub fn take_output(&mut self) -> String {
        self.output.take()
    }

    /// The underlying VM.
    #[must_use]
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Mutable access to the underlying VM, for advanced use.
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
