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

//! # Ki Value Module
//!
//! This module provides the generic value container used to pass arbitrary
//! payloads between the host and modules. KiValue is the fundamental unit of
//! data exchange in the Ki extensibility core.
//!
//! ## Design Principles
//!
//! - **Closed type set**: The supported payload types form a fixed sum type
//!   (bool, int, float, string, and homogeneous lists thereof). Downcast
//!   safety becomes an ordinary `match`; there is no open-ended runtime
//!   polymorphism to recover from
//! - **Immutable payloads**: Once constructed, a value's concrete type never
//!   changes; replacing a value replaces the whole container
//! - **Canonical numerics**: Integers are stored as `i64` and floats as
//!   `f64`, the widest types exchanged at the boundary; narrower views are
//!   obtained through the checked casts in [`crate::numeric`]
//!
//! ## External Representation
//!
//! Script callers exchange values as dynamically typed JSON. The conversion
//! is bidirectional and total for the supported type set; heterogeneous
//! lists, nulls, and objects are rejected with a `Conversion` error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{KiError, Result};

/// Identity of the concrete payload type held by a [`KiValue`].
///
/// The tag uniquely distinguishes payload types for safe downcast checks. It
/// carries no persistence or versioning guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KiValueTag {
    Bool,
    Int,
    Float,
    Str,
    BoolList,
    IntList,
    FloatList,
    StrList,
}

impl KiValueTag {
    /// Stable lowercase name used in manifests and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            KiValueTag::Bool => "bool",
            KiValueTag::Int => "int",
            KiValueTag::Float => "float",
            KiValueTag::Str => "string",
            KiValueTag::BoolList => "list-of-bool",
            KiValueTag::IntList => "list-of-int",
            KiValueTag::FloatList => "list-of-float",
            KiValueTag::StrList => "list-of-string",
        }
    }

    /// Parses a tag from its manifest spelling.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "bool" => Ok(KiValueTag::Bool),
            "int" => Ok(KiValueTag::Int),
            "float" => Ok(KiValueTag::Float),
            "string" => Ok(KiValueTag::Str),
            "list-of-bool" => Ok(KiValueTag::BoolList),
            "list-of-int" => Ok(KiValueTag::IntList),
            "list-of-float" => Ok(KiValueTag::FloatList),
            "list-of-string" => Ok(KiValueTag::StrList),
            other => Err(KiError::conversion(format!(
                "unknown value type tag: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for KiValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic typed payload exchanged between the host and modules.
///
/// Equality is structural and exact. In particular, floating-point payloads
/// compare with `==` on `f64`; there is no epsilon. Option defaulting relies
/// on this exact comparison (see [`crate::options::KiOption::is_default`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KiValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    BoolList(Vec<bool>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StrList(Vec<String>),
}

impl KiValue {
    /// Returns the type tag of the stored payload. Never fails.
    pub fn tag(&self) -> KiValueTag {
        match self {
            KiValue::Bool(_) => KiValueTag::Bool,
            KiValue::Int(_) => KiValueTag::Int,
            KiValue::Float(_) => KiValueTag::Float,
            KiValue::Str(_) => KiValueTag::Str,
            KiValue::BoolList(_) => KiValueTag::BoolList,
            KiValue::IntList(_) => KiValueTag::IntList,
            KiValue::FloatList(_) => KiValueTag::FloatList,
            KiValue::StrList(_) => KiValueTag::StrList,
        }
    }

    /// Returns the boolean payload or a `TypeMismatch` error.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            KiValue::Bool(v) => Ok(*v),
            other => Err(mismatch(KiValueTag::Bool, other)),
        }
    }

    /// Returns the canonical integer payload or a `TypeMismatch` error.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            KiValue::Int(v) => Ok(*v),
            other => Err(mismatch(KiValueTag::Int, other)),
        }
    }

    /// Returns the canonical float payload or a `TypeMismatch` error.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            KiValue::Float(v) => Ok(*v),
            other => Err(mismatch(KiValueTag::Float, other)),
        }
    }

    /// Returns the string payload or a `TypeMismatch` error.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            KiValue::Str(v) => Ok(v),
            other => Err(mismatch(KiValueTag::Str, other)),
        }
    }

    /// Returns the boolean list payload or a `TypeMismatch` error.
    pub fn as_bool_list(&self) -> Result<&[bool]> {
        match self {
            KiValue::BoolList(v) => Ok(v),
            other => Err(mismatch(KiValueTag::BoolList, other)),
        }
    }

    /// Returns the integer list payload or a `TypeMismatch` error.
    pub fn as_int_list(&self) -> Result<&[i64]> {
        match self {
            KiValue::IntList(v) => Ok(v),
            other => Err(mismatch(KiValueTag::IntList, other)),
        }
    }

    /// Returns the float list payload or a `TypeMismatch` error.
    pub fn as_float_list(&self) -> Result<&[f64]> {
        match self {
            KiValue::FloatList(v) => Ok(v),
            other => Err(mismatch(KiValueTag::FloatList, other)),
        }
    }

    /// Returns the string list payload or a `TypeMismatch` error.
    pub fn as_str_list(&self) -> Result<&[String]> {
        match self {
            KiValue::StrList(v) => Ok(v),
            other => Err(mismatch(KiValueTag::StrList, other)),
        }
    }

    /// Converts the payload to the dynamically typed boundary representation
    /// consumed by script callers.
    pub fn to_external(&self) -> Value {
        match self {
            KiValue::Bool(v) => json!(v),
            KiValue::Int(v) => json!(v),
            KiValue::Float(v) => json!(v),
            KiValue::Str(v) => json!(v),
            KiValue::BoolList(v) => json!(v),
            KiValue::IntList(v) => json!(v),
            KiValue::FloatList(v) => json!(v),
            KiValue::StrList(v) => json!(v),
        }
    }

    /// Builds a value from the dynamically typed boundary representation.
    ///
    /// Scalars map directly onto the closed type set. Lists must be
    /// homogeneous: a numeric list containing at least one float is coerced
    /// to `FloatList` when every integer member is exactly representable as
    /// `f64`; any other mixture is rejected with a `Conversion` error, as
    /// are nulls and objects.
    pub fn from_external(external: &Value) -> Result<Self> {
        match external {
            Value::Bool(v) => Ok(KiValue::Bool(*v)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(KiValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(KiValue::Float(f))
                } else {
                    Err(KiError::conversion(format!(
                        "unsupported numeric literal: {}",
                        n
                    )))
                }
            }
            Value::String(v) => Ok(KiValue::Str(v.clone())),
            Value::Array(items) => list_from_external(items),
            Value::Null => Err(KiError::conversion("null has no internal representation")),
            Value::Object(_) => Err(KiError::conversion(
                "objects are not a supported payload type",
            )),
        }
    }
}

fn mismatch(expected: KiValueTag, actual: &KiValue) -> KiError {
    KiError::type_mismatch(expected.as_str(), actual.tag().as_str())
}

fn list_from_external(items: &[Value]) -> Result<KiValue> {
    // Empty external lists carry no element type; default to list-of-string,
    // the only list kind whose element type cannot be confused with another.
    if items.is_empty() {
        return Ok(KiValue::StrList(Vec::new()));
    }

    if items.iter().all(Value::is_boolean) {
        let list = items.iter().filter_map(Value::as_bool).collect();
        return Ok(KiValue::BoolList(list));
    }

    if items.iter().all(Value::is_string) {
        let list = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        return Ok(KiValue::StrList(list));
    }

    if items.iter().all(Value::is_i64) {
        let list = items.iter().filter_map(Value::as_i64).collect();
        return Ok(KiValue::IntList(list));
    }

    if items.iter().all(Value::is_number) {
        // Mixed int/float numerics collapse into a float list, provided no
        // integer loses precision in the widening.
        let mut list = Vec::with_capacity(items.len());
        for item in items {
            if let Some(i) = item.as_i64() {
                list.push(crate::numeric::int_to_float(i)?);
            } else if let Some(f) = item.as_f64() {
                list.push(f);
            } else {
                return Err(KiError::conversion(format!(
                    "unsupported numeric list element: {}",
                    item
                )));
            }
        }
        return Ok(KiValue::FloatList(list));
    }

    Err(KiError::conversion(
        "heterogeneous lists are not a supported payload type",
    ))
}
