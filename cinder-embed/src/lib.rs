// cinder-embed - Embedding API for Cinder
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # cinder-embed
//!
//! A high-level embedding API for the Cinder scripting language.
//!
//! The [`Engine`] owns a VM, captures printed output, and converts between
//! Rust types and Cinder values through [`IntoValue`] and [`FromValue`].
//!
//! ## Quick Start
//!
//! ```rust
//! use cinder_embed::Engine;
//!
//! let mut engine = Engine::new();
//! engine.eval("print 1 + 2;").unwrap();
//! assert_eq!(engine.output(), "3\n");
//! ```
//!
//! ## Metered Execution
//!
//! ```rust
//! use cinder_embed::{Engine, EngineError, GasCosts, VmConfig};
//!
//! let config = VmConfig { gas_costs: Some(GasCosts::uniform(1)), ..VmConfig::default() };
//! let mut engine = Engine::with_config(config).with_gas(100);
//! let err = engine.eval("while (true) {}").unwrap_err();
//! assert!(matches!(err, EngineError::OutOfGas { used: 100 }));
//! ```

mod convert;
mod engine;
mod error;

pub use convert::{FromValue, IntoValue, from_value, to_value};
pub use engine::Engine;
pub use error::{EngineError, Result};

// Re-export core types for convenience
pub use cinder_vm::{GasCosts, NativeClass, NativeError, NativeResult, Value, VmConfig};
