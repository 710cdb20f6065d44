// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Cinder bytecode.
//!
//! One shared value stack serves every call frame. Each frame records the
//! closure it runs, its instruction pointer, and the stack slot where its
//! locals begin. The dispatch loop charges gas for each opcode before
//! executing it and hands the opcode to a handler by category.

pub mod error;
pub mod frame;
pub mod gas;
pub mod handlers;
pub mod stack;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, log_enabled, trace};

use crate::chunk::Function;
use crate::compiler::{CompileError, compile};
use crate::natives::{self, NativeClass, NativeFunction, NativeResult};
use crate::object::{Closure, Upvalue, UpvalueRef};
use crate::opcode::OpCode;
use crate::value::Value;

pub use error::{Result, RuntimeDiagnostic, RuntimeError, TraceFrame};
pub use frame::CallFrame;
pub use gas::{GasCosts, GasCostsError, GasMeter, OutOfGas};
pub use handlers::control::ControlFlow;
pub use stack::ValueStack;

/// Frame depth past which calls raise `Stack overflow.`
pub const DEFAULT_MAX_FRAMES: usize = 11_000;

// ============================================================================
// Configuration & Results
// ============================================================================

/// VM construction options.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Per-opcode prices. `None` makes every opcode free.
    pub gas_costs: Option<GasCosts>,
    pub max_frames: usize,
    /// Register `Array`, `Map` and `clock` as globals.
    pub install_stdlib: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            gas_costs: None,
            max_frames: DEFAULT_MAX_FRAMES,
            install_stdlib: true,
        }
    }
}

/// Outcome of a host write to a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetGlobal {
    pub was_new: bool,
    pub rejected_because_const: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretStatus {
    Ok,
    CompileError,
    RuntimeError,
    OutOfGas,
}

/// Structured result of one `interpret` call.
#[derive(Debug, Clone)]
pub struct InterpretResult {
    pub status: InterpretStatus,
    pub compile_errors: Vec<CompileError>,
    pub runtime_error: Option<RuntimeDiagnostic>,
    pub gas_used: u64,
}

impl InterpretResult {
    fn with_status(status: InterpretStatus, gas_used: u64) -> Self {
        InterpretResult {
            status,
            compile_errors: Vec::new(),
            runtime_error: None,
            gas_used,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == InterpretStatus::Ok
    }

    /// Human-readable diagnostics, one entry per compile error or one for the runtime error.
    pub fn diagnostics(&self) -> Vec<String> {
        match self.status {
            InterpretStatus::Ok => Vec::new(),
            InterpretStatus::CompileError => {
                self.compile_errors.iter().map(|e| e.to_string()).collect()
            }
            InterpretStatus::RuntimeError => self
                .runtime_error
                .iter()
                .map(|e| e.to_string())
                .collect(),
            InterpretStatus::OutOfGas => vec![format!("out of gas after {} units", self.gas_used)],
        }
    }
}

/// A global binding. Const bindings reject reassignment.
#[derive(Debug, Clone)]
struct Global {
    value: Value,
    is_const: bool,
}

// ============================================================================
// Virtual Machine
// ============================================================================

/// The Cinder virtual machine.
pub struct Vm {
    /// Value stack shared by every frame.
    stack: ValueStack,

    /// Call frame stack.
    frames: Vec<CallFrame>,

    /// Global variables. Persist across `interpret` calls.
    globals: HashMap<String, Global>,

    /// Upvalues still aliasing stack slots, highest slot first.
    open_upvalues: Vec<UpvalueRef>,

    config: VmConfig,

    gas: GasMeter,

    /// Where `print` writes.
    output: Box<dyn Write>,
}

impl Vm {
    /// Create a VM with the default configuration, printing to stdout.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut vm = Vm {
            stack: ValueStack::new(),
            frames: Vec::new(),
            globals: HashMap::new(),
            open_upvalues: Vec::new(),
            config,
            gas: GasMeter::default(),
            output: Box::new(io::stdout()),
        };
        if vm.config.install_stdlib {
            vm.install_stdlib();
        }
        vm
    }

    /// Redirect `print` output.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn set_gas_costs(&mut self, costs: Option<GasCosts>) {
        self.config.gas_costs = costs;
    }

    /// Gas used by the most recent run.
    pub fn gas_used(&self) -> u64 {
        self.gas.used()
    }

    fn install_stdlib(&mut self) {
        self.define_native_class(natives::array::class());
        self.define_native_class(natives::map::class());
        self.set_global("clock", Value::NativeFunction(Rc::new(natives::clock())));
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Compile and run `source`.
    pub fn interpret(&mut self, source: &str, gas_budget: Option<u64>) -> InterpretResult {
        match compile(source) {
            Ok(function) => self.interpret_function(Rc::new(function), gas_budget),
            Err(errors) => {
                let mut result = InterpretResult::with_status(InterpretStatus::CompileError, 0);
                result.compile_errors = errors.0;
                result
            }
        }
    }

    /// Run an already-compiled top-level function.
    pub fn interpret_function(
        &mut self,
        function: Rc<Function>,
        gas_budget: Option<u64>,
    ) -> InterpretResult {
        debug!(
            "interpret {} (gas budget {:?})",
            function.display_name(),
            gas_budget
        );
        self.reset_execution();
        self.gas = GasMeter::new(gas_budget);

        let closure = Rc::new(Closure::new(function));
        self.stack.push(Value::Closure(closure.clone()));
        let outcome = self.call_closure(closure, 0).and_then(|()| self.run(0));

        let result = match outcome {
            Ok(_) => InterpretResult::with_status(InterpretStatus::Ok, self.gas.used()),
            Err(RuntimeError::OutOfGas) => {
                InterpretResult::with_status(InterpretStatus::OutOfGas, self.gas.used())
            }
            Err(error) => {
                let diagnostic = self.diagnose(error);
                debug!("{}", diagnostic);
                let mut result =
                    InterpretResult::with_status(InterpretStatus::RuntimeError, self.gas.used());
                result.runtime_error = Some(diagnostic);
                result
            }
        };
        self.reset_execution();

        debug!(
            "interpret finished: {:?}, gas used {}",
            result.status, result.gas_used
        );
        result
    }

    /// Call a callable value with `args` and run it to completion.
    ///
    /// Usable from the host between runs and from inside a native callback.
    /// On error the stack is unwound back to where the call started.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let stop_depth = self.frames.len();
        let base = self.stack.len();
        if stop_depth == 0 {
            self.gas = GasMeter::new(None);
        }

        self.stack.push(callee.clone());
        for arg in args {
            self.stack.push(arg.clone());
        }

        let outcome = self.call_value(callee.clone(), args.len()).and_then(|()| {
            if self.frames.len() > stop_depth {
                self.run(stop_depth)
            } else {
                self.stack.pop()
            }
        });

        if outcome.is_err() {
            self.frames.truncate(stop_depth);
            self.close_upvalues(base);
            self.stack.truncate(base);
        }
        outcome
    }

    // ========================================================================
    // Globals & Natives
    // ========================================================================

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).map(|g| g.value.clone())
    }

    pub fn is_const_global(&self, name: &str) -> bool {
        self.globals.get(name).is_some_and(|g| g.is_const)
    }

    /// Assign a mutable global. Refused when the existing binding is const.
    pub fn set_global(&mut self, name: &str, value: Value) -> SetGlobal {
        self.bind_global(name, value, false)
    }

    /// Bind a const global. Refused when the existing binding is already const.
    pub fn define_const_global(&mut self, name: &str, value: Value) -> SetGlobal {
        self.bind_global(name, value, true)
    }

    fn bind_global(&mut self, name: &str, value: Value, is_const: bool) -> SetGlobal {
        match self.globals.get_mut(name) {
            Some(global) if global.is_const => SetGlobal {
                was_new: false,
                rejected_because_const: true,
            },
            Some(global) => {
                global.value = value;
                global.is_const = is_const;
                SetGlobal::default()
            }
            None => {
                self.globals
                    .insert(name.to_string(), Global { value, is_const });
                SetGlobal {
                    was_new: true,
                    rejected_because_const: false,
                }
            }
        }
    }

    /// Remove a global binding, const or not.
    pub fn remove_global(&mut self, name: &str) -> Option<Value> {
        self.globals.remove(name).map(|g| g.value)
    }

    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a native function as a global.
    pub fn define_native<F>(&mut self, name: &str, func: F) -> SetGlobal
    where
        F: Fn(&mut Vm, &[Value]) -> NativeResult + 'static,
    {
        let native = NativeFunction::new(name, func);
        self.set_global(name, Value::NativeFunction(Rc::new(native)))
    }

    /// Register a native class as a global under its own name.
    pub fn define_native_class(&mut self, class: impl Into<Rc<NativeClass>>) -> SetGlobal {
        let class = class.into();
        let name = class.name.clone();
        self.set_global(&name, Value::NativeClass(class))
    }

    // ========================================================================
    // Dispatch Loop
    // ========================================================================

    /// Execute until the frame stack drops back to `stop_depth`.
    pub(crate) fn run(&mut self, stop_depth: usize) -> Result<Value> {
        loop {
            if log_enabled!(log::Level::Trace) {
                if let Some(frame) = self.frames.last() {
                    let (text, _) = frame.chunk().disassemble_instruction(frame.ip);
                    trace!("{}", text);
                }
            }

            let op = self.read_op()?;
            self.charge_gas(op)?;

            match op {
                // Constants & Stack - handled inline (simple operations)
                OpCode::Constant => {
                    let value = self.read_constant()?;
                    self.stack.push(value);
                }
                OpCode::Null => self.stack.push(Value::Null),
                OpCode::True => self.stack.push(Value::Bool(true)),
                OpCode::False => self.stack.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.stack.pop()?;
                }
                OpCode::Print => {
                    let value = self.stack.pop()?;
                    writeln!(self.output, "{}", value)
                        .map_err(|e| RuntimeError::Output(e.to_string()))?;
                }

                // Variables - delegated to handler
                OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::GetGlobal
                | OpCode::DefineGlobal
                | OpCode::DefineConstGlobal
                | OpCode::SetGlobal => {
                    self.execute_variables(op)?;
                }

                // Upvalues - delegated to handler
                OpCode::GetUpvalue | OpCode::SetUpvalue | OpCode::CloseUpvalue => {
                    self.execute_upvalues(op)?;
                }

                // Arithmetic & comparison - delegated to handler
                OpCode::Equal
                | OpCode::Greater
                | OpCode::Less
                | OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Modulo
                | OpCode::Power
                | OpCode::BitAnd
                | OpCode::BitOr
                | OpCode::BitXor
                | OpCode::BitNot
                | OpCode::ShiftLeft
                | OpCode::ShiftRight
                | OpCode::Not
                | OpCode::Negate => {
                    self.execute_arithmetic(op)?;
                }

                // Control flow - delegated to handler
                OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::Loop
                | OpCode::Call
                | OpCode::Closure
                | OpCode::Return => match self.execute_control(op, stop_depth)? {
                    ControlFlow::Continue => {}
                    ControlFlow::Return(result) => return Ok(result),
                },

                // Classes & instances - delegated to handler
                OpCode::Class
                | OpCode::Inherit
                | OpCode::Method
                | OpCode::GetProperty
                | OpCode::SetProperty
                | OpCode::GetSuper
                | OpCode::Invoke
                | OpCode::SuperInvoke => {
                    self.execute_objects(op)?;
                }

                // Collections - delegated to handler
                OpCode::ArrayInit
                | OpCode::MapInit
                | OpCode::SubscriptGet
                | OpCode::SubscriptSet => {
                    self.execute_collections(op)?;
                }
            }
        }
    }

    #[inline]
    fn charge_gas(&mut self, op: OpCode) -> Result<()> {
        let cost = self.config.gas_costs.as_ref().map_or(0, |c| c.cost(op));
        self.gas.charge(cost).map_err(|OutOfGas| RuntimeError::OutOfGas)
    }

    // ========================================================================
    // Operand Decoding
    // ========================================================================

    pub(crate) fn frame(&self) -> Result<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::Internal("No active frame".into()))
    }

    fn frame_mut(&mut self) -> Result<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("No active frame".into()))
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        let frame = self.frame_mut()?;
        let byte = frame
            .chunk()
            .code
            .get(frame.ip)
            .copied()
            .ok_or_else(|| RuntimeError::Internal("IP out of bounds".into()))?;
        frame.ip += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_op(&mut self) -> Result<OpCode> {
        let byte = self.read_byte()?;
        OpCode::try_from(byte)
            .map_err(|b| RuntimeError::Internal(format!("Unknown opcode {}", b)))
    }

    pub(crate) fn read_constant(&mut self) -> Result<Value> {
        let idx = self.read_u16()?;
        self.frame()?
            .chunk()
            .constants
            .get(idx as usize)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal("Constant index out of bounds".into()))
    }

    /// Read a constant that must be a name.
    pub(crate) fn read_name(&mut self) -> Result<Rc<str>> {
        match self.read_constant()? {
            Value::String(name) => Ok(name),
            other => Err(RuntimeError::Internal(format!(
                "Expected a name constant, found {}",
                other.kind_name()
            ))),
        }
    }

    /// Move the current frame's instruction pointer by a signed distance.
    pub(crate) fn jump(&mut self, forward: bool, distance: u16) -> Result<()> {
        let frame = self.frame_mut()?;
        let distance = distance as usize;
        frame.ip = if forward {
            frame.ip + distance
        } else {
            frame.ip.checked_sub(distance).ok_or_else(|| {
                RuntimeError::Internal("Loop jumped before start of chunk".into())
            })?
        };
        Ok(())
    }

    // ========================================================================
    // Errors & Teardown
    // ========================================================================

    fn diagnose(&self, error: RuntimeError) -> RuntimeDiagnostic {
        RuntimeDiagnostic {
            error,
            trace: self.frames.iter().rev().map(CallFrame::trace).collect(),
        }
    }

    /// Clear the stack, frames and open upvalues. Globals are kept.
    fn reset_execution(&mut self) {
        // Captured slots must not keep aliasing a stack that is about to vanish.
        self.close_upvalues(0);
        self.frames.clear();
        self.stack.truncate(0);
    }

    /// Drop all state, breaking reference cycles, and reinstall the standard library.
    pub fn reset(&mut self) {
        self.teardown();
        self.gas = GasMeter::default();
        if self.config.install_stdlib {
            self.install_stdlib();
        }
    }

    /// Empty every container reachable from the globals and the stack.
    fn teardown(&mut self) {
        let mut pending: Vec<Value> = self.globals.drain().map(|(_, g)| g.value).collect();
        pending.extend(self.stack.take_all());
        self.frames.clear();
        for cell in self.open_upvalues.drain(..) {
            if let Upvalue::Closed(value) = cell.replace(Upvalue::Closed(Value::Null)) {
                pending.push(value);
            }
        }

        let mut visited: HashSet<usize> = HashSet::new();
        let mut released = 0usize;
        while let Some(value) = pending.pop() {
            let Some(addr) = value.heap_addr() else {
                continue;
            };
            if !visited.insert(addr) {
                continue;
            }
            released += 1;
            release(value, &mut pending);
        }
        debug!("vm teardown released {} object(s)", released);
    }
}

/// Empty one object's outgoing references onto `pending`.
fn release(value: Value, pending: &mut Vec<Value>) {
    match value {
        Value::Instance(instance) => {
            let fields: Vec<_> = instance.fields.borrow_mut().drain(..).collect();
            pending.extend(fields.into_iter().map(|(_, f)| f.value));
        }
        Value::Class(class) => {
            let methods: Vec<_> = class.methods.borrow_mut().drain().collect();
            pending.extend(methods.into_iter().map(|(_, m)| Value::Closure(m)));
        }
        Value::Closure(closure) => {
            for cell in &closure.upvalues {
                if let Upvalue::Closed(v) = cell.replace(Upvalue::Closed(Value::Null)) {
                    pending.push(v);
                }
            }
        }
        Value::BoundMethod(bound) => {
            pending.push(bound.receiver.clone());
            pending.push(Value::Closure(bound.method.clone()));
        }
        Value::Array(items) => {
            let items: Vec<_> = items.borrow_mut().drain(..).collect();
            pending.extend(items);
        }
        _ => {}
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Shared `print` sink for tests and embedders that capture output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(pub Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Take everything written so far, leaving the buffer empty.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
