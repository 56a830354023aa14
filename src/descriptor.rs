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

//! # Ki Module Descriptor
//!
//! Static metadata about a loadable module: its registry key, display name,
//! kind, install path, shared-object name, version, authorship, and the
//! canonical option set new instances are configured from.
//!
//! Descriptors are immutable once registered. They are usually parsed from a
//! declarative JSON manifest ([`KiModuleDescriptor::from_manifest`]) shipped
//! next to the module's shared object or script.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{KiError, Result};
use crate::options::KiOptionSet;

/// Immutable metadata describing a registered module.
#[derive(Clone, Debug)]
pub struct KiModuleDescriptor {
    key: String,
    name: String,
    kind: String,
    path: String,
    soname: Option<String>,
    version: String,
    authors: Vec<String>,
    description: String,
    references: Vec<String>,
    options: KiOptionSet,
}

impl KiModuleDescriptor {
    /// Assembles a descriptor directly. Host code registering builtin or
    /// script modules uses this; native modules usually come from a
    /// manifest.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        path: impl Into<String>,
        soname: Option<String>,
        version: impl Into<String>,
        authors: Vec<String>,
        description: impl Into<String>,
        references: Vec<String>,
        options: KiOptionSet,
    ) -> Self {
        KiModuleDescriptor {
            key: key.into(),
            name: name.into(),
            kind: kind.into(),
            path: path.into(),
            soname,
            version: version.into(),
            authors,
            description: description.into(),
            references,
            options,
        }
    }

    /// Parses a descriptor from the declarative manifest mapping.
    ///
    /// Required fields: `key`, `name`, `type`, `path`, `version`,
    /// `description`, `authors` (list), `refs` (list), `options` (nested
    /// mapping). Optional: `soname`. A missing required field raises a
    /// `Registry` error naming the field and the destination type.
    pub fn from_manifest(manifest: &Value) -> Result<Self> {
        let mapping = manifest
            .as_object()
            .ok_or_else(|| KiError::registry("<manifest>", "manifest must be an object"))?;

        let key = require_str(mapping, "key")?;
        let options_value = mapping
            .get("options")
            .ok_or_else(|| missing_field("options"))?;

        Ok(KiModuleDescriptor {
            key: key.to_string(),
            name: require_str(mapping, "name")?.to_string(),
            kind: require_str(mapping, "type")?.to_string(),
            path: require_str(mapping, "path")?.to_string(),
            soname: mapping
                .get("soname")
                .and_then(Value::as_str)
                .map(str::to_string),
            version: require_str(mapping, "version")?.to_string(),
            authors: require_str_list(mapping, "authors")?,
            description: require_str(mapping, "description")?.to_string(),
            references: require_str_list(mapping, "refs")?,
            options: KiOptionSet::from_external(options_value)?,
        })
    }

    /// Reads and parses a JSON manifest file.
    pub fn load_manifest(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let manifest: Value = serde_json::from_str(&text)?;
        Self::from_manifest(&manifest)
    }

    /// The registry key modules are looked up by.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human-readable display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module kind (e.g. "native", "script", or an application category).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Install path of the module's directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Shared-object file name, for natively compiled modules.
    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    /// Full filesystem path of the shared object, when one is declared.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.soname
            .as_ref()
            .map(|soname| Path::new(&self.path).join(soname))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// The canonical option set. Instances receive a clone of this, never
    /// the canonical set itself.
    pub fn options(&self) -> &KiOptionSet {
        &self.options
    }

    /// Module identity used to key the shared per-identity cache:
    /// `name-version`.
    pub fn identity(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

fn missing_field(field: &str) -> KiError {
    KiError::registry(
        field,
        format!("manifest is missing required field '{}' for KiModuleDescriptor", field),
    )
}

fn require_str<'a>(mapping: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a str> {
    mapping
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field(field))
}

fn require_str_list(mapping: &serde_json::Map<String, Value>, field: &str) -> Result<Vec<String>> {
    let items = mapping
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| missing_field(field))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                KiError::registry(
                    field,
                    format!("manifest field '{}' must be a list of strings", field),
                )
            })
        })
        .collect()
}
