// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Class and instance opcode handlers: class creation, inheritance,
//! property access and method invocation.

use std::rc::Rc;

use crate::natives::{NativeFunction, NativeMethod};
use crate::object::{BoundMethod, Class, Instance, InstanceClass};
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, Vm};

impl Vm {
    /// Execute a class or instance opcode.
    pub(crate) fn execute_objects(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Class => {
                let name = self.read_name()?;
                self.stack.push(Value::Class(Rc::new(Class::new(&*name))));
            }
            OpCode::Inherit => {
                let Value::Class(superclass) = self.stack.peek(1)?.clone() else {
                    return Err(RuntimeError::SuperclassNotClass);
                };
                let subclass = expect_class(self.stack.peek(0)?)?;
                // Copy-down: later methods on the subclass override these.
                let inherited: Vec<_> = superclass
                    .methods
                    .borrow()
                    .iter()
                    .map(|(name, method)| (name.clone(), method.clone()))
                    .collect();
                subclass.methods.borrow_mut().extend(inherited);
                self.stack.pop()?;
            }
            OpCode::Method => {
                let name = self.read_name()?;
                let Value::Closure(method) = self.stack.peek(0)?.clone() else {
                    return Err(RuntimeError::Internal("Method body must be a closure".into()));
                };
                let class = expect_class(self.stack.peek(1)?)?;
                class.methods.borrow_mut().insert(name.to_string(), method);
                self.stack.pop()?;
            }

            OpCode::GetProperty => {
                let name = self.read_name()?;
                let Value::Instance(instance) = self.stack.peek(0)?.clone() else {
                    return Err(RuntimeError::PropertyOnNonInstance);
                };
                let value = match instance.get_field(&name) {
                    Some(field) => field,
                    None => bind_method(&instance, &name)?,
                };
                self.stack.pop()?;
                self.stack.push(value);
            }
            OpCode::SetProperty => {
                let name = self.read_name()?;
                let value = self.stack.peek(0)?.clone();
                let Value::Instance(instance) = self.stack.peek(1)?.clone() else {
                    return Err(RuntimeError::FieldOnNonInstance);
                };
                instance
                    .set_field(&name, value.clone())
                    .map_err(|_| RuntimeError::ConstField(name.to_string()))?;
                self.stack.pop_n(2)?;
                self.stack.push(value);
            }
            OpCode::GetSuper => {
                let name = self.read_name()?;
                let superclass = self.pop_superclass()?;
                let receiver = self.stack.pop()?;
                let method = superclass
                    .find_method(&name)
                    .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))?;
                let bound = BoundMethod { receiver, method };
                self.stack.push(Value::BoundMethod(Rc::new(bound)));
            }

            OpCode::Invoke => {
                let name = self.read_name()?;
                let argc = self.read_byte()? as usize;
                self.invoke(&name, argc)?;
            }
            OpCode::SuperInvoke => {
                let name = self.read_name()?;
                let argc = self.read_byte()? as usize;
                let superclass = self.pop_superclass()?;
                match superclass.find_method(&name) {
                    Some(method) => self.call_closure(method, argc)?,
                    // `super()` against a parent without a constructor leaves the receiver.
                    None if &*name == "constructor" && argc == 0 => {}
                    None if &*name == "constructor" => {
                        return Err(RuntimeError::Arity {
                            expected: 0,
                            got: argc,
                        });
                    }
                    None => return Err(RuntimeError::UndefinedProperty(name.to_string())),
                }
            }
            _ => unreachable!("execute_objects called with {:?}", op),
        }
        Ok(())
    }

    fn pop_superclass(&mut self) -> Result<Rc<Class>> {
        match self.stack.pop()? {
            Value::Class(class) => Ok(class),
            _ => Err(RuntimeError::SuperclassNotClass),
        }
    }

    /// Call method `name` on the receiver `argc` slots below the top.
    ///
    /// A field holding a callable shadows a method of the same name.
    fn invoke(&mut self, name: &str, argc: usize) -> Result<()> {
        let Value::Instance(instance) = self.stack.peek(argc)?.clone() else {
            return Err(RuntimeError::MethodOnNonInstance);
        };

        if let Some(field) = instance.get_field(name) {
            self.stack.set_from_top(argc, field.clone())?;
            return self.call_value(field, argc);
        }

        match &instance.class {
            InstanceClass::Script(class) => {
                let method = class
                    .find_method(name)
                    .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))?;
                self.call_closure(method, argc)
            }
            InstanceClass::Native(class) => {
                let method = class
                    .method(name)
                    .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))?;
                self.call_native_method(&instance, &method, argc)
            }
        }
    }

    /// Run a native method on `instance` with the top `argc` values as arguments,
    /// replacing receiver and arguments with the result.
    pub(crate) fn call_native_method(
        &mut self,
        instance: &Rc<Instance>,
        method: &Rc<NativeMethod>,
        argc: usize,
    ) -> Result<()> {
        let receiver_slot = self.callee_slot(argc)?;
        let args = self.stack.top(argc)?.to_vec();
        let result = method(self, instance, &args)?;
        self.stack.truncate(receiver_slot);
        self.stack.push(result);
        Ok(())
    }
}

fn expect_class(value: &Value) -> Result<Rc<Class>> {
    match value {
        Value::Class(class) => Ok(class.clone()),
        other => Err(RuntimeError::Internal(format!(
            "Expected a class on the stack, found {}",
            other.kind_name()
        ))),
    }
}

/// Look up method `name` on the instance's class and bind it to the instance.
fn bind_method(instance: &Rc<Instance>, name: &str) -> Result<Value> {
    match &instance.class {
        InstanceClass::Script(class) => {
            let method = class
                .find_method(name)
                .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))?;
            let bound = BoundMethod {
                receiver: Value::Instance(instance.clone()),
                method,
            };
            Ok(Value::BoundMethod(Rc::new(bound)))
        }
        InstanceClass::Native(class) => {
            let method = class
                .method(name)
                .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))?;
            let receiver = instance.clone();
            let native = NativeFunction::new(name, move |vm, args| method(vm, &receiver, args));
            Ok(Value::NativeFunction(Rc::new(native)))
        }
    }
}
