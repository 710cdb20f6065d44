// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jumps, calls, closures and returns.

use std::rc::Rc;

use crate::object::{Closure, Instance, InstanceClass};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::frame::CallFrame;
use crate::vm::{Result, RuntimeError, Vm};

/// Result of executing a control flow instruction.
pub enum ControlFlow {
    /// Continue execution normally.
    Continue,
    /// The frame at the stop depth returned with this value.
    Return(Value),
}

impl Vm {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, op: OpCode, stop_depth: usize) -> Result<ControlFlow> {
        match op {
            OpCode::Jump => {
                let offset = self.read_u16()?;
                self.jump(true, offset)?;
            }
            OpCode::JumpIfFalse => {
                let offset = self.read_u16()?;
                if self.stack.peek(0)?.is_falsy() {
                    self.jump(true, offset)?;
                }
            }
            OpCode::Loop => {
                let offset = self.read_u16()?;
                self.jump(false, offset)?;
            }

            OpCode::Call => {
                let argc = self.read_byte()? as usize;
                let callee = self.stack.peek(argc)?.clone();
                self.call_value(callee, argc)?;
            }
            OpCode::Closure => {
                let function = match self.read_constant()? {
                    Value::Function(function) => function,
                    other => {
                        return Err(RuntimeError::Internal(format!(
                            "Closure operand must be a function, found {}",
                            other.kind_name()
                        )));
                    }
                };
                let (base, enclosing) = {
                    let frame = self.frame()?;
                    (frame.base, frame.closure.clone())
                };
                let mut upvalues = Vec::with_capacity(function.upvalues.len());
                for desc in &function.upvalues {
                    let index = desc.index as usize;
                    let cell = if desc.is_local {
                        self.capture_upvalue(base + index)
                    } else {
                        enclosing.upvalues.get(index).cloned().ok_or_else(|| {
                            RuntimeError::Internal(format!("Upvalue {} out of range", index))
                        })?
                    };
                    upvalues.push(cell);
                }
                let closure = Closure::with_upvalues(function, upvalues);
                self.stack.push(Value::Closure(Rc::new(closure)));
            }

            OpCode::Return => {
                let result = self.stack.pop()?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::Internal("Return with no active frame".into()))?;
                self.close_upvalues(frame.base);
                self.stack.truncate(frame.base);

                if self.frames.len() <= stop_depth {
                    return Ok(ControlFlow::Return(result));
                }
                self.stack.push(result);
            }
            _ => unreachable!("execute_control called with {:?}", op),
        }
        Ok(ControlFlow::Continue)
    }

    /// Call `callee`, which sits `argc` slots below the top with its arguments above it.
    ///
    /// Closures push a frame; natives run to completion and leave their result
    /// in the callee's slot.
    pub(crate) fn call_value(&mut self, callee: Value, argc: usize) -> Result<()> {
        match callee {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::BoundMethod(bound) => {
                self.stack.set_from_top(argc, bound.receiver.clone())?;
                self.call_closure(bound.method.clone(), argc)
            }
            Value::Class(class) => {
                let instance = Instance::new(InstanceClass::Script(class.clone()));
                self.stack
                    .set_from_top(argc, Value::Instance(Rc::new(instance)))?;
                match class.find_method("constructor") {
                    Some(constructor) => self.call_closure(constructor, argc),
                    None if argc != 0 => Err(RuntimeError::Arity {
                        expected: 0,
                        got: argc,
                    }),
                    None => Ok(()),
                }
            }
            Value::NativeClass(class) => {
                let instance = Rc::new(Instance::new(InstanceClass::Native(class.clone())));
                self.stack
                    .set_from_top(argc, Value::Instance(instance.clone()))?;
                match class.method("constructor") {
                    Some(constructor) => {
                        let args = self.stack.top(argc)?.to_vec();
                        constructor(self, &instance, &args)?;
                        let len = self.stack.len();
                        self.stack.truncate(len - argc);
                        Ok(())
                    }
                    None if argc != 0 => Err(RuntimeError::Arity {
                        expected: 0,
                        got: argc,
                    }),
                    None => Ok(()),
                }
            }
            Value::NativeFunction(native) => {
                let callee_slot = self.callee_slot(argc)?;
                let args = self.stack.top(argc)?.to_vec();
                let result = native.call(self, &args)?;
                self.stack.truncate(callee_slot);
                self.stack.push(result);
                Ok(())
            }
            _ => Err(RuntimeError::NotCallable),
        }
    }

    /// Push a frame for `closure` after checking arity and depth.
    pub(crate) fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<()> {
        let expected = closure.function.arity as usize;
        if argc != expected {
            return Err(RuntimeError::Arity {
                expected,
                got: argc,
            });
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::StackOverflow);
        }
        let base = self.callee_slot(argc)?;
        self.frames.push(CallFrame::new(closure, base));
        Ok(())
    }

    /// Absolute stack index of the callee below `argc` arguments.
    pub(crate) fn callee_slot(&self, argc: usize) -> Result<usize> {
        self.stack
            .len()
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)
    }
}
