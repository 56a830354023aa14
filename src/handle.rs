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

//! # Ki Scoped Module Handle
//!
//! Move-only RAII ownership of a created module instance. Whatever the exit
//! path (normal return, early return, panic unwinding), the instance is
//! destroyed through the registry's bookkeeping exactly once.
//!
//! The handle deliberately exposes *only* member access to the wrapped
//! instance: there is no raw-pointer extraction, no `release`, and no
//! reachable deleter, so callers cannot accidentally double-own or leak the
//! instance. Use [`KiScopedModule::destroy`] when destructor failures must
//! be observed; `Drop` logs them instead.

use std::any::type_name;
use std::sync::Arc;

use crate::descriptor::KiModuleDescriptor;
use crate::errors::{KiError, Result};
use crate::graph::KiInstanceTable;
use crate::module::KiModule;
use crate::store::KiSharedCache;
use crate::value::KiValue;

/// RAII handle owning one module instance.
#[derive(Debug)]
pub struct KiScopedModule {
    id: u64,
    name: String,
    table: Arc<KiInstanceTable>,
    cache: KiSharedCache,
    destroyed: bool,
}

impl KiScopedModule {
    pub(crate) fn new(
        id: u64,
        name: String,
        table: Arc<KiInstanceTable>,
        cache: KiSharedCache,
    ) -> Self {
        KiScopedModule {
            id,
            name,
            table,
            cache,
            destroyed: false,
        }
    }

    /// The registry-assigned unique instance ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The instance name (the descriptor's display name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared cache blob for this instance's module identity.
    pub fn cache(&self) -> &KiSharedCache {
        &self.cache
    }

    /// Explicitly destroys the instance, surfacing any `ModuleDestroy`
    /// failure to the caller. Consumes the handle; `Drop` will not destroy
    /// again.
    pub fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        self.table.destroy(self.id)
    }

    /// Runs `f` against the wrapped module instance.
    pub fn with_module<R>(&self, f: impl FnOnce(&mut dyn KiModule) -> R) -> Result<R> {
        self.table
            .with_module(self.id, f)
            .ok_or_else(|| KiError::registry(&self.name, "instance no longer exists"))
    }

    /// Runs `f` against the instance downcast to its concrete type.
    /// A wrong type is a `Registry` error (bad typed-handle cast).
    pub fn with_module_as<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.with_module(|module| module.as_any_mut().downcast_mut::<T>().map(f))?
            .ok_or_else(|| {
                KiError::registry(
                    &self.name,
                    format!("module instance is not a {}", type_name::<T>()),
                )
            })
    }

    /// Descriptor snapshot the instance was created from.
    pub fn descriptor(&self) -> Result<Arc<KiModuleDescriptor>> {
        self.table
            .descriptor_of(self.id)
            .ok_or_else(|| KiError::registry(&self.name, "instance no longer exists"))
    }

    /// Parent instance ID, or `None` for a root.
    pub fn parent(&self) -> Result<Option<u64>> {
        self.with_node(|node| node.parent)
    }

    fn with_node<R>(&self, f: impl FnOnce(&mut crate::graph::KiGraphNode) -> R) -> Result<R> {
        self.table
            .with_node(self.id, f)
            .ok_or_else(|| KiError::registry(&self.name, "instance no longer exists"))
    }

    // --- per-instance options -------------------------------------------

    /// Validates and replaces an option's current value on this instance's
    /// option set. Never touches the registry's canonical set.
    pub fn change_option(&self, key: &str, value: KiValue) -> Result<()> {
        self.with_node(|node| node.options.change(key, value))?
    }

    /// Effective value of an option (current if set, else default).
    pub fn option(&self, key: &str) -> Result<KiValue> {
        self.with_node(|node| node.options.value(key).map(KiValue::clone))?
    }

    /// Clears an option's current value.
    pub fn reset_option(&self, key: &str) -> Result<()> {
        self.with_node(|node| node.options.reset_to_default(key))?
    }

    /// True iff every required option has a current or default value.
    pub fn all_required_satisfied(&self) -> Result<bool> {
        self.with_node(|node| node.options.all_required_satisfied())
    }

    /// Enables or disables expert mode on this instance's option set.
    pub fn set_expert(&self, expert: bool) -> Result<()> {
        self.with_node(|node| node.options.set_expert(expert))
    }

    /// Aggregated validation of this instance's option set.
    pub fn enforce_valid_options(&self) -> Result<()> {
        self.with_node(|node| node.options.enforce_valid())?
    }

    // --- state bundle ----------------------------------------------------

    /// Stores a value in the instance's state bundle.
    pub fn bundle_insert(&self, key: &str, value: KiValue) -> Result<()> {
        self.with_node(|node| node.bundle.insert(key, value))
    }

    /// Copy of a bundle entry, if present.
    pub fn bundle_get(&self, key: &str) -> Result<Option<KiValue>> {
        self.with_node(|node| node.bundle.get(key).cloned())
    }

    /// Shared handle to a bundle entry, for explicit cross-map sharing.
    pub fn bundle_share(&self, key: &str) -> Result<Option<Arc<KiValue>>> {
        self.with_node(|node| node.bundle.share(key))
    }

    /// Adopts an already-shared payload into the bundle.
    pub fn bundle_adopt(&self, key: &str, value: Arc<KiValue>) -> Result<()> {
        self.with_node(|node| node.bundle.insert_shared(key, value))
    }
}

impl Drop for KiScopedModule {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(err) = self.table.destroy(self.id) {
            log::error!(
                "handle.destroy_failed: destructor failed during scope exit - module={}, id={}, error={}",
                self.name,
                self.id,
                err
            );
        }
    }
}
