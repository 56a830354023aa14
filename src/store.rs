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

//! # Ki Value Store Module
//!
//! Keyed storage for [`KiValue`] containers. A [`KiValueMap`] owns its
//! entries; a value can additionally be *shared* into another map, in which
//! case both maps hold independent reference-counted handles to the same
//! immutable payload.
//!
//! ## Sharing Semantics
//!
//! Payloads are never mutated after creation. The map exposes no mutable
//! access to stored values; the only way to "change" an entry is to replace
//! the whole container with `insert`. Replacing an entry in one map never
//! affects another map that shared the old payload: the other map keeps its
//! own reference alive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::value::KiValue;

/// Inheritable per-instance state bundle carried by graph nodes.
///
/// The bundle holds shared computed-result handles (in the host application,
/// wavefunction-like data) that child instances copy at creation time.
pub type KiStateBundle = KiValueMap;

/// Cache blob shared by reference among all instances of one module
/// identity (`name-version`).
///
/// The mutex guards the map structure only; coordinating the *contents*
/// across instances is the module's own responsibility.
pub type KiSharedCache = Arc<Mutex<KiValueMap>>;

/// String-keyed map of reference-counted [`KiValue`] containers.
#[derive(Clone, Debug, Default)]
pub struct KiValueMap {
    inner: HashMap<String, Arc<KiValue>>,
}

impl KiValueMap {
    pub fn new() -> Self {
        KiValueMap {
            inner: HashMap::new(),
        }
    }

    /// Stores a value under `key`, replacing (and dropping) any previous
    /// container held under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: KiValue) {
        self.inner.insert(key.into(), Arc::new(value));
    }

    /// Adopts an already-shared payload under `key`. Both maps subsequently
    /// hold the same immutable payload.
    pub fn insert_shared(&mut self, key: impl Into<String>, value: Arc<KiValue>) {
        self.inner.insert(key.into(), value);
    }

    /// Returns a reference to the payload stored under `key`.
    pub fn get(&self, key: &str) -> Option<&KiValue> {
        self.inner.get(key).map(Arc::as_ref)
    }

    /// Returns a shared handle to the payload stored under `key`, suitable
    /// for [`insert_shared`](Self::insert_shared) into another map.
    pub fn share(&self, key: &str) -> Option<Arc<KiValue>> {
        self.inner.get(key).cloned()
    }

    /// Removes the entry under `key`, returning its shared handle if it
    /// existed. The payload itself is freed once the last handle drops.
    pub fn remove(&mut self, key: &str) -> Option<Arc<KiValue>> {
        self.inner.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KiValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}
