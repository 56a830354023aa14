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

//! # Ki Options Module
//!
//! Typed, validated configuration for module instances. A [`KiOption`] is a
//! named slot with a required flag, an immutable default, an optional
//! current value, and an optional validator. A [`KiOptionSet`] is a
//! case-insensitive, insertion-ordered collection of such slots.
//!
//! ## Lifecycle
//!
//! Option sets are usually built from a declarative manifest (see
//! [`KiOptionSet::from_external`]) and attached to a
//! [`crate::descriptor::KiModuleDescriptor`]. When a module instance is
//! created, the registry attaches a deep clone of the descriptor's canonical
//! set, so per-instance changes never leak back into the registry.
//!
//! ## Expert Mode
//!
//! Expert mode is an explicit opt-in escape hatch that downgrades
//! validation failures from hard errors to logged warnings. Invalid values
//! are applied anyway; the caller owns the consequences.

use serde_json::{json, Map, Value};

use crate::errors::{KiError, Result};
use crate::numeric;
use crate::value::{KiValue, KiValueTag};

/// Signature of a per-option validator.
pub type KiOptionValidator = fn(&KiValue) -> Result<()>;

/// Signature of a whole-set validator, used for cross-option constraints.
pub type KiSetValidator = fn(&KiOptionSet) -> Vec<KiOptionIssue>;

/// A validator paired with the stable name it is referenced by in
/// declarative manifests.
#[derive(Clone, Copy, Debug)]
pub struct KiNamedValidator {
    pub name: &'static str,
    pub check: KiOptionValidator,
}

fn check_non_negative(value: &KiValue) -> Result<()> {
    let ok = match value {
        KiValue::Int(v) => *v >= 0,
        KiValue::Float(v) => *v >= 0.0,
        _ => {
            return Err(KiError::conversion(format!(
                "non_negative expects a numeric value, found {}",
                value.tag()
            )))
        }
    };
    if ok {
        Ok(())
    } else {
        Err(KiError::conversion("value must be non-negative"))
    }
}

fn check_positive(value: &KiValue) -> Result<()> {
    let ok = match value {
        KiValue::Int(v) => *v > 0,
        KiValue::Float(v) => *v > 0.0,
        _ => {
            return Err(KiError::conversion(format!(
                "positive expects a numeric value, found {}",
                value.tag()
            )))
        }
    };
    if ok {
        Ok(())
    } else {
        Err(KiError::conversion("value must be positive"))
    }
}

fn check_non_empty(value: &KiValue) -> Result<()> {
    let ok = match value {
        KiValue::Str(v) => !v.is_empty(),
        KiValue::BoolList(v) => !v.is_empty(),
        KiValue::IntList(v) => !v.is_empty(),
        KiValue::FloatList(v) => !v.is_empty(),
        KiValue::StrList(v) => !v.is_empty(),
        _ => {
            return Err(KiError::conversion(format!(
                "non_empty expects a string or list, found {}",
                value.tag()
            )))
        }
    };
    if ok {
        Ok(())
    } else {
        Err(KiError::conversion("value must be non-empty"))
    }
}

impl KiNamedValidator {
    /// Rejects negative numeric values.
    pub fn non_negative() -> Self {
        KiNamedValidator {
            name: "non_negative",
            check: check_non_negative,
        }
    }

    /// Rejects zero and negative numeric values.
    pub fn positive() -> Self {
        KiNamedValidator {
            name: "positive",
            check: check_positive,
        }
    }

    /// Rejects empty strings and empty lists.
    pub fn non_empty() -> Self {
        KiNamedValidator {
            name: "non_empty",
            check: check_non_empty,
        }
    }

    /// Resolves a builtin validator from its manifest name.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "non_negative" => Ok(Self::non_negative()),
            "positive" => Ok(Self::positive()),
            "non_empty" => Ok(Self::non_empty()),
            other => Err(KiError::option(
                other,
                "unknown validator name in option declaration",
            )),
        }
    }
}

/// A single validation finding reported by [`KiOptionSet::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KiOptionIssue {
    pub key: String,
    pub message: String,
}

/// A named, typed configuration slot.
#[derive(Clone, Debug)]
pub struct KiOption {
    key: String,
    required: bool,
    declared: Option<KiValueTag>,
    default: Option<KiValue>,
    value: Option<KiValue>,
    validator: Option<KiNamedValidator>,
    help: String,
}

impl KiOption {
    /// Declares an option slot.
    ///
    /// Fails fast with an `Option` error when a required option also
    /// supplies a default (the combination is contradictory) or when the
    /// default fails its own validator.
    pub fn new(
        key: impl Into<String>,
        required: bool,
        validator: Option<KiNamedValidator>,
        help: impl Into<String>,
        default: Option<KiValue>,
    ) -> Result<Self> {
        let key = key.into();
        if required && default.is_some() {
            return Err(KiError::option(
                &key,
                "a required option must not declare a default",
            ));
        }
        if let (Some(validator), Some(default)) = (&validator, &default) {
            (validator.check)(default)
                .map_err(|e| KiError::option(&key, format!("default failed validation: {}", e)))?;
        }
        Ok(KiOption {
            key,
            required,
            declared: None,
            default,
            value: None,
            validator,
            help: help.into(),
        })
    }

    /// Pins the slot to a declared payload type. Once pinned, `change`
    /// rejects values of any other type, and the declaration round-trips
    /// through the external representation.
    pub fn with_tag(mut self, tag: KiValueTag) -> Result<Self> {
        if let Some(default) = &self.default {
            if default.tag() != tag {
                return Err(KiError::option(
                    &self.key,
                    format!(
                        "default has type {} but the declaration says {}",
                        default.tag(),
                        tag
                    ),
                ));
            }
        }
        self.declared = Some(tag);
        Ok(self)
    }

    /// The declared payload type, when the slot was pinned to one.
    pub fn declared_tag(&self) -> Option<KiValueTag> {
        self.declared
    }

    /// The option key in its declared (display) casing. Lookups through a
    /// [`KiOptionSet`] are case-insensitive.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn default(&self) -> Option<&KiValue> {
        self.default.as_ref()
    }

    pub fn validator(&self) -> Option<&KiNamedValidator> {
        self.validator.as_ref()
    }

    /// Returns the current value if set, else the default. Fails with an
    /// `Option` error when neither exists.
    pub fn get(&self) -> Result<&KiValue> {
        self.value
            .as_ref()
            .or(self.default.as_ref())
            .ok_or_else(|| KiError::option(&self.key, "no value set and no default declared"))
    }

    /// Canonical integer payload, narrowed to the caller's type.
    pub fn get_int_as<T: TryFrom<i64>>(&self) -> Result<T> {
        numeric::int_cast(self.get()?.as_int()?)
    }

    /// Canonical float payload, narrowed to `f32` with a round-trip check.
    pub fn get_f32(&self) -> Result<f32> {
        numeric::float_cast_f32(self.get()?.as_float()?)
    }

    /// Validates and replaces the current value. The default is immutable
    /// after construction; only the current slot ever changes.
    ///
    /// In expert mode an invalid value is logged and applied anyway; a value
    /// of the wrong declared type is a hard error in either mode.
    pub fn change(&mut self, value: KiValue, expert: bool) -> Result<()> {
        if let Some(declared) = self.declared {
            if value.tag() != declared {
                return Err(KiError::option(
                    &self.key,
                    format!("expected a {} value, found {}", declared, value.tag()),
                ));
            }
        }
        if let Some(validator) = &self.validator {
            if let Err(err) = (validator.check)(&value) {
                if !expert {
                    return Err(KiError::option(&self.key, format!("invalid value: {}", err)));
                }
                log::warn!(
                    "options.expert_override: invalid value applied under expert mode - option={}, validator={}, error={}",
                    self.key,
                    validator.name,
                    err
                );
            }
        }
        self.value = Some(value);
        Ok(())
    }

    /// Clears the current value; subsequent reads fall back to the default.
    pub fn reset_to_default(&mut self) {
        self.value = None;
    }

    /// True when no current value is set, or the current value equals the
    /// default.
    ///
    /// Equality is exact, including floating-point payloads. A float option
    /// changed to a value that differs from its default by one ulp is *not*
    /// at its default; no epsilon is applied.
    pub fn is_default(&self) -> bool {
        match &self.value {
            None => true,
            Some(value) => self.default.as_ref() == Some(value),
        }
    }

    /// True when a current value or a default is available.
    pub fn has_value(&self) -> bool {
        self.value.is_some() || self.default.is_some()
    }

    fn validate_into(&self, issues: &mut Vec<KiOptionIssue>) {
        if self.required && !self.has_value() {
            issues.push(KiOptionIssue {
                key: self.key.clone(),
                message: "required option has no value".to_string(),
            });
        }
        // Expert mode can have let an invalid value through `change`;
        // validation re-checks the stored value.
        if let (Some(validator), Some(value)) = (&self.validator, &self.value) {
            if let Err(err) = (validator.check)(value) {
                issues.push(KiOptionIssue {
                    key: self.key.clone(),
                    message: format!("invalid value: {}", err),
                });
            }
        }
    }
}

/// Case-insensitive, insertion-ordered collection of [`KiOption`] slots.
///
/// Cloning performs a deep copy of every option, which is how per-instance
/// sets are derived from a descriptor's canonical set.
#[derive(Clone, Debug, Default)]
pub struct KiOptionSet {
    order: Vec<String>,
    inner: std::collections::HashMap<String, KiOption>,
    set_validator: Option<KiSetValidator>,
    expert: bool,
}

impl KiOptionSet {
    pub fn new() -> Self {
        KiOptionSet::default()
    }

    /// Adds an option slot. Duplicate keys (case-insensitive) are rejected.
    pub fn add(&mut self, option: KiOption) -> Result<()> {
        let lower = option.key.to_ascii_lowercase();
        if self.inner.contains_key(&lower) {
            return Err(KiError::option(option.key(), "duplicate option key"));
        }
        self.order.push(lower.clone());
        self.inner.insert(lower, option);
        Ok(())
    }

    /// Installs a whole-set validator consulted by [`validate`](Self::validate).
    pub fn set_validator(&mut self, validator: KiSetValidator) {
        self.set_validator = Some(validator);
    }

    /// Enables or disables expert mode for every option in the set.
    pub fn set_expert(&mut self, expert: bool) {
        if expert && !self.expert {
            log::warn!("options.expert_enabled: validation failures downgraded to warnings");
        }
        self.expert = expert;
    }

    pub fn expert(&self) -> bool {
        self.expert
    }

    pub fn get(&self, key: &str) -> Result<&KiOption> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .ok_or_else(|| KiError::option(key, "unknown option"))
    }

    /// Effective value of an option: current if set, else default.
    pub fn value(&self, key: &str) -> Result<&KiValue> {
        self.get(key)?.get()
    }

    /// Validates and replaces an option's current value, honoring the set's
    /// expert mode.
    pub fn change(&mut self, key: &str, value: KiValue) -> Result<()> {
        let expert = self.expert;
        let option = self
            .inner
            .get_mut(&key.to_ascii_lowercase())
            .ok_or_else(|| KiError::option(key, "unknown option"))?;
        option.change(value, expert)
    }

    /// Clears an option's current value.
    pub fn reset_to_default(&mut self, key: &str) -> Result<()> {
        self.inner
            .get_mut(&key.to_ascii_lowercase())
            .ok_or_else(|| KiError::option(key, "unknown option"))?
            .reset_to_default();
        Ok(())
    }

    /// True iff every required option has a current or default value.
    /// Never fails.
    pub fn all_required_satisfied(&self) -> bool {
        self.iter().all(|o| !o.required() || o.has_value())
    }

    /// Collects every validation finding without failing: per-option
    /// required/validator checks plus the whole-set validator, if any.
    pub fn validate(&self) -> Vec<KiOptionIssue> {
        let mut issues = Vec::new();
        for option in self.iter() {
            option.validate_into(&mut issues);
        }
        if let Some(set_validator) = self.set_validator {
            issues.extend(set_validator(self));
        }
        issues
    }

    /// Fails with a single aggregated `Option` error when any finding
    /// exists, unless expert mode is active, in which case every finding is
    /// logged and the set is accepted.
    pub fn enforce_valid(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            return Ok(());
        }
        if self.expert {
            for issue in &issues {
                log::warn!(
                    "options.expert_accept: validation finding ignored under expert mode - option={}, finding={}",
                    issue.key,
                    issue.message
                );
            }
            return Ok(());
        }
        let summary = issues
            .iter()
            .map(|i| format!("{}: {}", i.key, i.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(KiError::option("<set>", summary))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(&key.to_ascii_lowercase())
    }

    /// Iterates over options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KiOption> {
        self.order.iter().filter_map(|k| self.inner.get(k))
    }

    /// Display-cased keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.iter().map(KiOption::key).collect()
    }

    /// Builds a set from the declarative external representation: a mapping
    /// from option key to a 5-tuple
    /// `[typeTag, default-or-null, required, validator-name-or-null, help]`.
    pub fn from_external(external: &Value) -> Result<Self> {
        let mapping = external.as_object().ok_or_else(|| {
            KiError::conversion("option set declaration must be a key/tuple mapping")
        })?;

        let mut set = KiOptionSet::new();
        for (key, entry) in mapping {
            set.add(option_from_tuple(key, entry)?)?;
        }
        Ok(set)
    }

    /// Emits the declarative external representation of this set. Current
    /// values are not part of the representation; only declarations are.
    pub fn to_external(&self) -> Value {
        let mut mapping = Map::new();
        for option in self.iter() {
            let tag = option
                .declared_tag()
                .or_else(|| option.default().map(KiValue::tag))
                .map(KiValueTag::as_str)
                .unwrap_or("string");
            let tuple = json!([
                tag,
                option.default().map(KiValue::to_external).unwrap_or(Value::Null),
                option.required(),
                option.validator().map(|v| json!(v.name)).unwrap_or(Value::Null),
                option.help(),
            ]);
            mapping.insert(option.key().to_string(), tuple);
        }
        Value::Object(mapping)
    }
}

fn option_from_tuple(key: &str, entry: &Value) -> Result<KiOption> {
    let tuple = entry.as_array().filter(|t| t.len() == 5).ok_or_else(|| {
        KiError::option(
            key,
            "option declaration must be a 5-tuple [type, default, required, validator, help]",
        )
    })?;

    let tag_name = tuple[0]
        .as_str()
        .ok_or_else(|| KiError::option(key, "type tag must be a string"))?;
    let tag = KiValueTag::parse(tag_name)?;

    let default = match &tuple[1] {
        Value::Null => None,
        other => Some(
            KiValue::from_external(other)
                .map_err(|e| KiError::option(key, format!("bad default: {}", e)))?,
        ),
    };

    let required = tuple[2]
        .as_bool()
        .ok_or_else(|| KiError::option(key, "required flag must be a bool"))?;

    let validator = match &tuple[3] {
        Value::Null => None,
        Value::String(name) => Some(KiNamedValidator::by_name(name)?),
        _ => {
            return Err(KiError::option(
                key,
                "validator must be a builtin validator name or null",
            ))
        }
    };

    let help = tuple[4]
        .as_str()
        .ok_or_else(|| KiError::option(key, "help text must be a string"))?;

    KiOption::new(key, required, validator, help, default)?.with_tag(tag)
}
