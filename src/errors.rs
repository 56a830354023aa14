//! Copyright © 2025-2026 The Ki Project Developers. All Rights Reserved.
//!
//! This file is part of Ki.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Ki Error Module
//!
//! This module defines the error types and utilities used throughout the Ki
//! extensibility core for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Ki uses a structured error approach with the following principles:
//!
//! - **Explicit Error Types**: Each error variant represents a specific
//!   category of failure, so callers can react programmatically rather than
//!   matching on message strings
//! - **Context-Rich**: Errors carry the module key, option name, library
//!   path, or type names involved in the failure
//! - **Recoverable**: Every variant is recoverable; errors propagate across
//!   the registry/module boundary and are caught by the outermost
//!   orchestration layer for user-facing reporting
//! - **Serde Support**: Errors can be serialized/deserialized for logging
//!   and persistence
//!
//! ## Error Categories
//!
//! - **Registry**: Missing/duplicate module keys, bad typed-handle casts
//! - **ModuleLoad**: Dynamic-library open or symbol-resolution failures,
//!   script-callable arity mismatches
//! - **ModuleCreate**: Factory invocation failed or returned null
//! - **ModuleDestroy**: A module destructor failed (registry bookkeeping has
//!   already been repaired before this is raised)
//! - **Option**: Missing option, invalid value, required-but-unset,
//!   conflicting required+default declarations
//! - **NumericConversion**: Overflow/underflow/precision loss during a safe
//!   numeric cast
//! - **Conversion**: External/internal representation mismatch for a value
//! - **TypeMismatch**: Wrong concrete type requested from a value container
//! - **Io / Serde**: Filesystem and manifest deserialization failures

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Ki Core.
pub type Result<T> = std::result::Result<T, KiError>;

/// Canonical error enumeration for Ki Core.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum KiError {
    /// Missing or duplicate module key, or a bad cast when retrieving a
    /// typed module handle.
    #[error("registry error for '{key}': {message}")]
    Registry { key: String, message: String },

    /// Dynamic-library open/symbol-resolution failure, or a script callable
    /// that does not satisfy the factory signature contract.
    #[error("module load error at '{path}': {message}")]
    ModuleLoad { path: String, message: String },

    /// A module factory failed or returned a null instance.
    #[error("failed to create module '{module}' from '{path}': {message}")]
    ModuleCreate {
        module: String,
        path: String,
        message: String,
    },

    /// A module destructor failed. Registry bookkeeping for the instance has
    /// already been removed when this is raised.
    #[error("failed to destroy module '{module}': {message}")]
    ModuleDestroy { module: String, message: String },

    /// Invalid option declarations, values, or lookups.
    #[error("option '{option}': {message}")]
    Option { option: String, message: String },

    /// Overflow, underflow, or precision loss during a safe numeric cast.
    #[error("cannot convert {from} to {to}: {message}")]
    NumericConversion {
        from: String,
        to: String,
        message: String,
    },

    /// External/internal representation mismatch for a generic value.
    #[error("conversion error: {message}")]
    Conversion { message: String },

    /// Wrong concrete type requested from a generic value container.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Errors originating from filesystem IO (manifest loading).
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<io::Error> for KiError {
    fn from(err: io::Error) -> Self {
        KiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KiError {
    fn from(err: serde_json::Error) -> Self {
        KiError::Serde(err.to_string())
    }
}

impl KiError {
    /// Helper to construct registry errors.
    pub fn registry(key: impl Into<String>, message: impl Into<String>) -> Self {
        KiError::Registry {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Helper to construct module load errors.
    pub fn module_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        KiError::ModuleLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Helper to construct module creation errors.
    pub fn module_create(
        module: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        KiError::ModuleCreate {
            module: module.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Helper to construct module destruction errors.
    pub fn module_destroy(module: impl Into<String>, message: impl Into<String>) -> Self {
        KiError::ModuleDestroy {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Helper to construct option errors.
    pub fn option(option: impl Into<String>, message: impl Into<String>) -> Self {
        KiError::Option {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Helper to construct numeric conversion errors.
    pub fn numeric(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        KiError::NumericConversion {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Helper to construct conversion errors.
    pub fn conversion<T: Into<String>>(message: T) -> Self {
        KiError::Conversion {
            message: message.into(),
        }
    }

    /// Helper to construct type mismatch errors.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        KiError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
