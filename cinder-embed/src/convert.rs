// cinder-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and Cinder values.
//!
//! This module provides the [`IntoValue`] and [`FromValue`] traits for
//! converting between Rust types and [`Value`].
//!
//! # Built-in Conversions
//!
//! | Rust Type | Cinder Type |
//! |-----------|-------------|
//! | `()` | `null` |
//! | `bool` | `Bool` |
//! | `i32`, `i64`, `u32`, `u64`, `usize`, `BigInt` | `Number` |
//! | `String`, `&str` | `String` |
//! | `Vec<T>` | `Array` instance |
//! | `Option<T>` | `T` or `null` |
//! | `HashMap<String, T>` | `Map` instance |
//!
//! # Custom Conversions
//!
//! ```rust
//! use cinder_embed::{EngineError, FromValue, IntoValue, Result, Value};
//!
//! struct Point { x: i64, y: i64 }
//!
//! impl IntoValue for Point {
//!     fn into_value(self) -> Value {
//!         vec![self.x, self.y].into_value()
//!     }
//! }
//!
//! impl FromValue for Point {
//!     fn from_value(value: &Value) -> Result<Self> {
//!         match Vec::<i64>::from_value(value)?.as_slice() {
//!             [x, y] => Ok(Point { x: *x, y: *y }),
//!             _ => Err(EngineError::Type { expected: "array of 2 numbers", found: value.to_string() }),
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;

use cinder_vm::natives::{array, map};
use cinder_vm::{Instance, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{EngineError, Result};

/// Convert a Rust type into a `Value`.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a `Value` into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

/// Short description of a value for type errors.
fn describe(value: &Value) -> String {
    match value {
        Value::Instance(instance) => format!("{} instance", instance.class_name()),
        other => other.kind_name().trim_start_matches("Obj").to_string(),
    }
}

// ============================================================================
// IntoValue implementations
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! into_number {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::number(self)
                }
            }
        )*
    };
}

into_number!(i32, i64, u32, u64, usize, BigInt);

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        array::new_array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn into_value(self) -> Value {
        map::new_map(
            self.into_iter()
                .map(|(k, v)| (Value::string(k), v.into_value())),
        )
    }
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(EngineError::type_error("null", describe(other))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(EngineError::type_error("bool", describe(other))),
        }
    }
}

impl FromValue for BigInt {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(n.clone()),
            other => Err(EngineError::type_error("number", describe(other))),
        }
    }
}

macro_rules! from_number {
    ($($t:ty => $convert:ident),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::Number(n) => n.$convert().ok_or_else(|| EngineError::OutOfRange {
                            value: n.to_string(),
                            target: stringify!($t),
                        }),
                        other => Err(EngineError::type_error("number", describe(other))),
                    }
                }
            }
        )*
    };
}

from_number!(i32 => to_i32, i64 => to_i64, u32 => to_u32, u64 => to_u64, usize => to_usize);

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(EngineError::type_error("string", describe(other))),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        let cell = value
            .as_instance()
            .and_then(|instance| array::elements(instance).ok())
            .ok_or_else(|| EngineError::type_error("Array", describe(value)))?;
        let items = cell.borrow();
        items.iter().map(T::from_value).collect()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value) -> Result<Self> {
        let instance: &Instance = value
            .as_instance()
            .filter(|instance| instance.class_name() == "Map")
            .ok_or_else(|| EngineError::type_error("Map", describe(value)))?;
        let fields = instance.fields.borrow();
        let mut result = HashMap::with_capacity(fields.len());
        for (key, field) in fields.iter() {
            result.insert(key.clone(), T::from_value(&field.value)?);
        }
        Ok(result)
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Convert a Rust value into a `Value`.
#[must_use]
pub fn to_value<T: IntoValue>(value: T) -> Value {
    value.into_value()
}

/// Convert a `Value` into a Rust type.
pub fn from_value<T: FromValue>(value: &Value) -> Result<T> {
    T::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_range_checked() {
        let big = Value::number(BigInt::from(u64::MAX));
        assert!(matches!(
            i64::from_value(&big),
            Err(EngineError::OutOfRange { target: "i64", .. })
        ));
        assert_eq!(u64::from_value(&big).unwrap(), u64::MAX);
    }

    #[test]
    fn test_vec_round_trip() {
        let value = vec![1i64, 2, 3].into_value();
        assert_eq!(value.to_string(), "Array [ 1, 2, 3 ]");
        assert_eq!(Vec::<i64>::from_value(&value).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(None::<i64>.into_value(), Value::Null);
    }

    #[test]
    fn test_type_errors_name_what_was_found() {
        let err = String::from_value(&Value::number(1)).unwrap_err();
        assert_eq!(err.to_string(), "type error: expected string, found Number");
        let err = Vec::<i64>::from_value(&HashMap::<String, i64>::new().into_value()).unwrap_err();
        assert_eq!(err.to_string(), "type error: expected Array, found Map instance");
    }
}
