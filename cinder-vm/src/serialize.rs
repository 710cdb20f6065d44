// cinder-vm - Bytecode compiler and virtual machine for the Cinder programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode serialization.
//!
//! A compiled [`Function`] maps onto a plain-data tree that serde encodes as
//! JSON with camelCase keys:
//!
//! ```text
//! {name?, arity, isConstant, upvalues: [{index, isLocal}], lines: [int], code: [int],
//!  constants: [{type, value, isConstant}]}
//! ```
//!
//! Only literal constants and nested functions can appear in a constant pool,
//! so only `ObjNull`, `ObjBool`, `ObjNumber`, `ObjString` and `ObjFunction`
//! are representable. Numbers travel as decimal text.

use std::rc::Rc;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::{Chunk, Function, UpvalueDescriptor};
use crate::opcode::OpCode;
use crate::value::Value;

/// Error converting between a [`Function`] and its serialized form.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("type {kind} not supported in ObjFunction {method} method.")]
    Unsupported { kind: String, method: &'static str },

    #[error("invalid number constant '{0}'")]
    InvalidNumber(String),

    #[error("line table has {lines} entries but code has {code} bytes")]
    LineTableMismatch { lines: usize, code: usize },

    #[error("invalid opcode byte {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    #[error("instruction at offset {0} is missing operand bytes")]
    Truncated(usize),

    #[error("invalid bytecode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializeError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub arity: u8,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub upvalues: Vec<SerializedUpvalue>,
    pub lines: Vec<u32>,
    pub code: Vec<u8>,
    #[serde(default)]
    pub constants: Vec<SerializedConstant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedUpvalue {
    pub index: u8,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedConstant {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: ConstantPayload,
    #[serde(default)]
    pub is_constant: bool,
}

/// The `value` field of a serialized constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantPayload {
    Null,
    Bool(bool),
    Text(String),
    Function(Box<SerializedFunction>),
}

const NULL_TAG: &str = "ObjNull";
const BOOL_TAG: &str = "ObjBool";
const NUMBER_TAG: &str = "ObjNumber";
const STRING_TAG: &str = "ObjString";
const FUNCTION_TAG: &str = "ObjFunction";

// ============================================================================
// Function -> data
// ============================================================================

/// Convert a compiled function into its serializable form.
pub fn serialize(function: &Function) -> Result<SerializedFunction> {
    let constants = function
        .chunk
        .constants
        .iter()
        .map(serialize_constant)
        .collect::<Result<Vec<_>>>()?;

    Ok(SerializedFunction {
        name: function.name.clone(),
        arity: function.arity,
        is_constant: function.is_constant,
        upvalues: function
            .upvalues
            .iter()
            .map(|u| SerializedUpvalue {
                index: u.index,
                is_local: u.is_local,
            })
            .collect(),
        lines: function.chunk.lines.clone(),
        code: function.chunk.code.clone(),
        constants,
    })
}

fn serialize_constant(value: &Value) -> Result<SerializedConstant> {
    let (kind, payload) = match value {
        Value::Null => (NULL_TAG, ConstantPayload::Null),
        Value::Bool(b) => (BOOL_TAG, ConstantPayload::Bool(*b)),
        Value::Number(n) => (NUMBER_TAG, ConstantPayload::Text(n.to_string())),
        Value::String(s) => (STRING_TAG, ConstantPayload::Text(s.to_string())),
        Value::Function(f) => (FUNCTION_TAG, ConstantPayload::Function(Box::new(serialize(f)?))),
        other => {
            return Err(SerializeError::Unsupported {
                kind: other.kind_name().to_string(),
                method: "serialize",
            });
        }
    };
    Ok(SerializedConstant {
        kind: kind.to_string(),
        value: payload,
        is_constant: false,
    })
}

// ============================================================================
// data -> Function
// ============================================================================

/// Rebuild a function from its serialized form, validating the bytecode shape.
pub fn deserialize(data: &SerializedFunction) -> Result<Function> {
    if data.lines.len() != data.code.len() {
        return Err(SerializeError::LineTableMismatch {
            lines: data.lines.len(),
            code: data.code.len(),
        });
    }
    validate_code(&data.code)?;

    let constants = data
        .constants
        .iter()
        .map(deserialize_constant)
        .collect::<Result<Vec<_>>>()?;

    Ok(Function {
        name: data.name.clone(),
        arity: data.arity,
        is_constant: data.is_constant,
        upvalues: data
            .upvalues
            .iter()
            .map(|u| UpvalueDescriptor {
                index: u.index,
                is_local: u.is_local,
            })
            .collect(),
        chunk: Chunk {
            code: data.code.clone(),
            lines: data.lines.clone(),
            constants,
        },
    })
}

/// Walk the instruction stream checking opcode bytes and operand lengths.
fn validate_code(code: &[u8]) -> Result<()> {
    let mut offset = 0;
    while offset < code.len() {
        let byte = code[offset];
        let op = OpCode::try_from(byte).map_err(|byte| SerializeError::InvalidOpcode { byte, offset })?;
        let next = offset + 1 + op.operand_width();
        if next > code.len() {
            return Err(SerializeError::Truncated(offset));
        }
        offset = next;
    }
    Ok(())
}

fn deserialize_constant(constant: &SerializedConstant) -> Result<Value> {
    let value = match (constant.kind.as_str(), &constant.value) {
        (NULL_TAG, ConstantPayload::Null) => Value::Null,
        (BOOL_TAG, ConstantPayload::Bool(b)) => Value::Bool(*b),
        (NUMBER_TAG, ConstantPayload::Text(text)) => {
            let n: BigInt = text
                .parse()
                .map_err(|_| SerializeError::InvalidNumber(text.clone()))?;
            Value::Number(n)
        }
        (STRING_TAG, ConstantPayload::Text(text)) => Value::string(text),
        (FUNCTION_TAG, ConstantPayload::Function(f)) => Value::Function(Rc::new(deserialize(f)?)),
        (kind, _) => {
            return Err(SerializeError::Unsupported {
                kind: kind.to_string(),
                method: "deserialize",
            });
        }
    };
    Ok(value)
}

// ============================================================================
// JSON
// ============================================================================

pub fn to_json(function: &Function) -> Result<String> {
    Ok(serde_json::to_string(&serialize(function)?)?)
}

pub fn to_json_pretty(function: &Function) -> Result<String> {
    Ok(serde_json::to_string_pretty(&serialize(function)?)?)
}

pub fn from_json(text: &str) -> Result<Function> {
    let data: SerializedFunction = serde_json::from_str(text)?;
    deserialize(&data)
}
