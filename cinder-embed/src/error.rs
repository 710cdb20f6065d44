// cinder-embed - Embedding API for Cinder
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Errors surfaced by the embedding API.

use std::io;

use cinder_vm::{CompileErrors, RuntimeDiagnostic, RuntimeError};
use thiserror::Error;

/// Everything that can go wrong when driving an [`Engine`](crate::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The source did not compile. Carries every diagnostic.
    #[error("{0}")]
    Compile(CompileErrors),

    /// The script failed at runtime.
    #[error("{0}")]
    Runtime(RuntimeDiagnostic),

    /// The gas budget ran out.
    #[error("out of gas after {used} units")]
    OutOfGas { used: u64 },

    /// A host-initiated call failed.
    #[error("{0}")]
    Call(#[from] RuntimeError),

    #[error("undefined global '{0}'")]
    UndefinedGlobal(String),

    #[error("Cannot reassign const {0}")]
    ConstGlobal(String),

    /// A value could not be converted to the requested Rust type.
    #[error("type error: expected {expected}, found {found}")]
    Type { expected: &'static str, found: String },

    #[error("{value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub(crate) fn type_error(expected: &'static str, found: impl Into<String>) -> Self {
        EngineError::Type {
            expected,
            found: found.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
