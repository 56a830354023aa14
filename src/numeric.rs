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

//! # Ki Numeric Conversion Module
//!
//! Safe conversions between the canonical wide storage types (`i64`/`f64`)
//! and the narrower types callers actually request. Overflow and precision
//! loss are hard errors, never silent truncation:
//!
//! - integer → integer: the value must fit the target range
//! - float → float: the value must survive a round-trip through the target
//! - float → integer: the value must have a zero fractional part and fit
//! - integer → float: the float must represent the integer exactly
//!
//! Every failure raises a `NumericConversion` error naming both types.

use std::any::type_name;
use std::convert::{TryFrom, TryInto};

use crate::errors::{KiError, Result};

/// Checked cast from the canonical integer storage to a caller integer type.
pub fn int_cast<T>(value: i64) -> Result<T>
where
    T: TryFrom<i64>,
{
    T::try_from(value).map_err(|_| {
        KiError::numeric(
            type_name::<i64>(),
            type_name::<T>(),
            format!("{} is outside the target range", value),
        )
    })
}

/// Checked widening of a caller integer into the canonical `i64` storage.
///
/// Needed for types such as `u64` and `u128` whose full range does not fit.
pub fn store_int<T>(value: T) -> Result<i64>
where
    T: TryInto<i64> + std::fmt::Display + Copy,
{
    value.try_into().map_err(|_| {
        KiError::numeric(
            type_name::<T>(),
            type_name::<i64>(),
            format!("{} is outside the i64 range", value),
        )
    })
}

/// Checked narrowing of the canonical float storage to `f32`.
///
/// The cast must round-trip exactly; a value that changes when widened back
/// to `f64` has lost precision and is rejected.
pub fn float_cast_f32(value: f64) -> Result<f32> {
    let narrowed = value as f32;
    if f64::from(narrowed) == value || (value.is_nan() && narrowed.is_nan()) {
        Ok(narrowed)
    } else {
        Err(KiError::numeric(
            type_name::<f64>(),
            type_name::<f32>(),
            format!("{} does not round-trip through f32", value),
        ))
    }
}

/// Checked conversion of the canonical float storage to the canonical
/// integer storage. The value must be integral and in range.
pub fn float_to_int(value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(KiError::numeric(
            type_name::<f64>(),
            type_name::<i64>(),
            format!("{} is not a finite value", value),
        ));
    }
    if value.fract() != 0.0 {
        return Err(KiError::numeric(
            type_name::<f64>(),
            type_name::<i64>(),
            format!("{} has a nonzero fractional part", value),
        ));
    }
    // i64::MAX itself is not exactly representable as f64; compare against
    // the exclusive upper bound 2^63, which is.
    if value < i64::MIN as f64 || value >= 9_223_372_036_854_775_808.0 {
        return Err(KiError::numeric(
            type_name::<f64>(),
            type_name::<i64>(),
            format!("{} is outside the i64 range", value),
        ));
    }
    Ok(value as i64)
}

/// Checked conversion of the canonical integer storage to the canonical
/// float storage. The float must represent the integer exactly, which fails
/// for most magnitudes beyond 2^53.
pub fn int_to_float(value: i64) -> Result<f64> {
    let widened = value as f64;
    // The round-trip comparison alone is fooled near i64::MAX, where the
    // saturating f64 -> i64 cast lands back on the original value; the
    // exclusive 2^63 bound closes that hole.
    if widened as i64 == value && widened < 9_223_372_036_854_775_808.0 {
        Ok(widened)
    } else {
        Err(KiError::numeric(
            type_name::<i64>(),
            type_name::<f64>(),
            format!("{} is not exactly representable as f64", value),
        ))
    }
}
