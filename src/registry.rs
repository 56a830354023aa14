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

//! # Ki Module Registry
//!
//! The central keyed store of module descriptors and factories. The
//! registry issues unique instance IDs, maintains the calculation-graph
//! node for every created instance, and owns the per-identity shared
//! caches reused across calls.
//!
//! ## Lifecycle
//!
//! A module moves through `Unregistered -> Registered -> Instantiated ->
//! Destroyed`. Registration stores the descriptor; factory resolution is
//! lazy, so a native module whose library is broken registers fine and
//! fails on the first `create`.
//!
//! ## Concurrency
//!
//! The registry follows the surrounding application's single-threaded,
//! cooperative calling convention: module methods call other modules
//! synchronously and recursively. The unique-ID counter is atomic (and
//! owned by the registry instance, never process-global, so independent
//! registries coexist in tests); all other mutations assume single-writer
//! access per registry instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::descriptor::KiModuleDescriptor;
use crate::errors::{KiError, Result};
use crate::graph::{KiGraphNode, KiInstanceTable};
use crate::handle::KiScopedModule;
use crate::loader::{KiNativeLoader, KiScriptArgs, KiScriptCallable};
use crate::store::{KiSharedCache, KiStateBundle};

/// How a registered module's factory is obtained.
#[derive(Debug)]
enum KiModuleOrigin {
    /// Resolved through the OS dynamic loader from the descriptor's
    /// shared-object path.
    Native,
    /// Backed by a host-registered script callable.
    Script(KiScriptCallable),
}

#[derive(Debug)]
struct KiRegisteredModule {
    descriptor: Arc<KiModuleDescriptor>,
    origin: KiModuleOrigin,
}

/// One failure found by [`KiModuleRegistry::test_all`].
#[derive(Debug)]
pub struct KiTestFailure {
    pub key: String,
    pub error: KiError,
}

/// Central store of module descriptors, factories, instances, and caches.
#[derive(Debug, Default)]
pub struct KiModuleRegistry {
    modules: HashMap<String, KiRegisteredModule>,
    loader: KiNativeLoader,
    instances: Arc<KiInstanceTable>,
    next_id: AtomicU64,
    caches: HashMap<String, KiSharedCache>,
}

impl KiModuleRegistry {
    pub fn new() -> Self {
        KiModuleRegistry {
            modules: HashMap::new(),
            loader: KiNativeLoader::new(),
            instances: Arc::new(KiInstanceTable::new()),
            next_id: AtomicU64::new(0),
            caches: HashMap::new(),
        }
    }

    /// Registers a natively compiled module. The shared object is not
    /// opened here; resolution happens on the first `create`.
    ///
    /// Strong guarantee: on a duplicate key the registry is untouched.
    pub fn register(&mut self, descriptor: KiModuleDescriptor) -> Result<()> {
        self.insert(descriptor, KiModuleOrigin::Native)
    }

    /// Registers a script-hosted module. The callable's arity is verified
    /// eagerly; a mismatch is a `ModuleLoad` error and nothing is stored.
    pub fn register_script(
        &mut self,
        descriptor: KiModuleDescriptor,
        callable: KiScriptCallable,
    ) -> Result<()> {
        callable.verify(descriptor.key())?;
        self.insert(descriptor, KiModuleOrigin::Script(callable))
    }

    fn insert(&mut self, descriptor: KiModuleDescriptor, origin: KiModuleOrigin) -> Result<()> {
        let lower = descriptor.key().to_ascii_lowercase();
        if self.modules.contains_key(&lower) {
            return Err(KiError::registry(descriptor.key(), "duplicate module key"));
        }
        log::info!(
            "registry.module.register: module registered - key={}, name={}, version={}, kind={}",
            descriptor.key(),
            descriptor.name(),
            descriptor.version(),
            descriptor.kind()
        );
        self.modules.insert(
            lower,
            KiRegisteredModule {
                descriptor: Arc::new(descriptor),
                origin,
            },
        );
        Ok(())
    }

    /// Looks up a registered descriptor by key (case-insensitive).
    pub fn descriptor(&self, key: &str) -> Result<Arc<KiModuleDescriptor>> {
        self.modules
            .get(&key.to_ascii_lowercase())
            .map(|m| Arc::clone(&m.descriptor))
            .ok_or_else(|| KiError::registry(key, "unknown module key"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains_key(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered keys, sorted for deterministic iteration.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.modules.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The instance bookkeeping table.
    pub fn instances(&self) -> &KiInstanceTable {
        &self.instances
    }

    /// The shared cache blob for a module identity (`name-version`), if any
    /// instance of that identity has been created.
    pub fn cache(&self, identity: &str) -> Option<KiSharedCache> {
        self.caches.get(identity).cloned()
    }

    /// Creates an instance of the module registered under `key`.
    ///
    /// The instance receives a fresh unique ID (strictly increasing, never
    /// reused), a clone of the descriptor's canonical option set, a graph
    /// node whose state bundle is copied from `parent` (or defaulted for a
    /// root), and the shared cache for its module identity.
    ///
    /// Loader failures propagate as `ModuleLoad`; factory failures and null
    /// results surface as `ModuleCreate` with key/name/path context; an
    /// unknown key or parent is a `Registry` error.
    pub fn create(&mut self, key: &str, parent: Option<u64>) -> Result<KiScopedModule> {
        let entry = self
            .modules
            .get(&key.to_ascii_lowercase())
            .ok_or_else(|| KiError::registry(key, "unknown module key"))?;
        let descriptor = Arc::clone(&entry.descriptor);

        // Validate the parent before burning an ID.
        let bundle = match parent {
            Some(parent_id) => self.instances.bundle_of(parent_id).ok_or_else(|| {
                KiError::registry(key, format!("parent instance {} does not exist", parent_id))
            })?,
            None => KiStateBundle::new(),
        };

        let cache = Arc::clone(
            self.caches
                .entry(descriptor.identity())
                .or_insert_with(KiSharedCache::default),
        );

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let module = match &entry.origin {
            KiModuleOrigin::Native => {
                let library_path = descriptor.library_path().ok_or_else(|| {
                    KiError::module_load(
                        descriptor.path(),
                        "descriptor declares no shared-object name",
                    )
                })?;
                let library = self.loader.resolve(&library_path)?;
                library.create_instance(descriptor.name(), id)?
            }
            KiModuleOrigin::Script(callable) => callable
                .invoke(KiScriptArgs {
                    name: descriptor.name(),
                    id,
                    cache: &cache,
                    descriptor: &descriptor,
                })
                .map_err(|e| {
                    KiError::module_create(descriptor.name(), descriptor.path(), e.to_string())
                })?,
        };

        let node = KiGraphNode {
            id,
            parent,
            descriptor: Arc::clone(&descriptor),
            options: descriptor.options().clone(),
            bundle,
        };
        self.instances.insert(node, module);

        log::info!(
            "registry.module.create: instance created - key={}, id={}, parent={:?}, identity={}",
            key,
            id,
            parent,
            descriptor.identity()
        );

        Ok(KiScopedModule::new(
            id,
            descriptor.name().to_string(),
            Arc::clone(&self.instances),
            cache,
        ))
    }

    /// Destroys the instance under `id` through the bookkeeping table.
    /// Idempotent; see [`KiInstanceTable::destroy`] for the ordering
    /// guarantee on destructor failure.
    pub fn destroy(&self, id: u64) -> Result<()> {
        self.instances.destroy(id)
    }

    /// Verifies every registered module: the canonical option set must have
    /// all required options satisfiable, and a trial create/destroy cycle
    /// must succeed. Failures are aggregated; the scan never aborts early.
    pub fn test_all(&mut self) -> Vec<KiTestFailure> {
        let mut failures = Vec::new();
        for key in self.keys() {
            let descriptor = match self.descriptor(&key) {
                Ok(d) => d,
                Err(error) => {
                    failures.push(KiTestFailure { key, error });
                    continue;
                }
            };
            if !descriptor.options().all_required_satisfied() {
                failures.push(KiTestFailure {
                    key: key.clone(),
                    error: KiError::option(
                        &key,
                        "a required option has neither a value nor a default",
                    ),
                });
            }
            match self.create(&key, None) {
                Ok(handle) => {
                    if let Err(error) = handle.destroy() {
                        failures.push(KiTestFailure { key, error });
                    }
                }
                Err(error) => failures.push(KiTestFailure { key, error }),
            }
        }
        if failures.is_empty() {
            log::info!("registry.test_all.ok: all registered modules passed - count={}", self.len());
        } else {
            log::warn!(
                "registry.test_all.failures: some modules failed verification - failed={}, total={}",
                failures.len(),
                self.len()
            );
        }
        failures
    }
}
