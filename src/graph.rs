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

//! # Ki Calculation Graph
//!
//! Per-instance bookkeeping for the lightweight calculation graph. Every
//! created module instance gets a [`KiGraphNode`] linking it to its parent
//! (or marking it a root), carrying the descriptor snapshot it was created
//! from, its per-instance option set, and its inheritable state bundle.
//!
//! Nodes live in an explicit arena ([`KiInstanceTable`]) indexed by the
//! instance ID. Instance IDs are never reused, so a retired slot stays a
//! tombstone: "instance no longer exists" is a checkable state, not an
//! absent hash key.
//!
//! ## Destruction Ordering
//!
//! [`KiInstanceTable::destroy`] removes the slot's bookkeeping *before*
//! invoking the module's shutdown. A failing destructor therefore cannot
//! leave the table in an inconsistent, double-free-prone state: the
//! instance is gone either way, and the failure surfaces as a
//! `ModuleDestroy` error.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::descriptor::KiModuleDescriptor;
use crate::errors::{KiError, Result};
use crate::module::KiModule;
use crate::options::KiOptionSet;
use crate::store::KiStateBundle;

/// Graph bookkeeping for one created instance.
#[derive(Debug)]
pub struct KiGraphNode {
    pub id: u64,
    /// Parent instance ID; `None` marks a root.
    pub parent: Option<u64>,
    /// The descriptor snapshot used to create this instance.
    pub descriptor: Arc<KiModuleDescriptor>,
    /// Per-instance clone of the descriptor's canonical option set.
    pub options: KiOptionSet,
    /// Inheritable state bundle, copied from the parent at creation time.
    pub bundle: KiStateBundle,
}

/// A live instance: its graph node plus the module object itself.
#[derive(Debug)]
struct KiLiveInstance {
    node: KiGraphNode,
    module: Box<dyn KiModule>,
}

/// One arena slot, indexed by instance ID.
#[derive(Debug)]
enum KiSlot {
    /// The ID was allocated but creation failed before insertion; IDs are
    /// never reused, so the slot stays vacant forever.
    Vacant,
    Live(KiLiveInstance),
    /// The instance existed and has been destroyed.
    Retired,
}

/// ID-indexed arena of instance slots.
///
/// The interior mutex exists so scoped handles can destroy their instance
/// through a shared `Arc` on any exit path; it does not make the
/// surrounding registry safe for concurrent registration (see the
/// concurrency notes on [`crate::registry::KiModuleRegistry`]).
#[derive(Debug, Default)]
pub struct KiInstanceTable {
    slots: Mutex<Vec<KiSlot>>,
}

impl KiInstanceTable {
    pub fn new() -> Self {
        KiInstanceTable {
            slots: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<KiSlot>> {
        // A panic mid-operation leaves no torn state worth preserving;
        // recover the guard rather than propagating poisoning.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts the bookkeeping and module for a freshly created instance.
    /// Intermediate IDs burned by failed creations become vacant slots.
    pub fn insert(&self, node: KiGraphNode, module: Box<dyn KiModule>) {
        let mut slots = self.lock();
        let index = node.id as usize;
        while slots.len() <= index {
            slots.push(KiSlot::Vacant);
        }
        slots[index] = KiSlot::Live(KiLiveInstance { node, module });
    }

    /// Destroys the instance under `id`.
    ///
    /// Idempotent: a vacant, retired, or never-allocated ID is a no-op
    /// `Ok`. For a live instance the slot is tombstoned first, then the
    /// module's `shutdown` runs (outside the lock); a shutdown failure is
    /// reported as `ModuleDestroy`, with the bookkeeping removal preserved.
    pub fn destroy(&self, id: u64) -> Result<()> {
        let taken = {
            let mut slots = self.lock();
            let index = id as usize;
            match slots.get_mut(index) {
                Some(slot @ KiSlot::Live(_)) => match std::mem::replace(slot, KiSlot::Retired) {
                    KiSlot::Live(instance) => Some(instance),
                    _ => unreachable!("slot was just matched as live"),
                },
                _ => None,
            }
        };

        let Some(mut instance) = taken else {
            log::debug!("graph.instance.destroy_noop: no live instance - id={}", id);
            return Ok(());
        };

        let name = instance.module.name().to_string();
        log::debug!(
            "graph.instance.destroy: tearing down instance - id={}, module={}",
            id,
            name
        );
        instance
            .module
            .shutdown()
            .map_err(|e| KiError::module_destroy(name, e.to_string()))
    }

    /// True when the instance exists and has not been destroyed.
    pub fn is_live(&self, id: u64) -> bool {
        matches!(self.lock().get(id as usize), Some(KiSlot::Live(_)))
    }

    /// True when the instance existed at some point and has been destroyed.
    pub fn is_retired(&self, id: u64) -> bool {
        matches!(self.lock().get(id as usize), Some(KiSlot::Retired))
    }

    pub fn live_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|slot| matches!(slot, KiSlot::Live(_)))
            .count()
    }

    /// Runs `f` against the live instance's graph node.
    pub fn with_node<R>(&self, id: u64, f: impl FnOnce(&mut KiGraphNode) -> R) -> Option<R> {
        let mut slots = self.lock();
        match slots.get_mut(id as usize) {
            Some(KiSlot::Live(instance)) => Some(f(&mut instance.node)),
            _ => None,
        }
    }

    /// Runs `f` against the live instance's module object.
    pub fn with_module<R>(&self, id: u64, f: impl FnOnce(&mut dyn KiModule) -> R) -> Option<R> {
        let mut slots = self.lock();
        match slots.get_mut(id as usize) {
            Some(KiSlot::Live(instance)) => Some(f(instance.module.as_mut())),
            _ => None,
        }
    }

    /// Copy of a live instance's state bundle, for inheritance by children.
    pub fn bundle_of(&self, id: u64) -> Option<KiStateBundle> {
        self.with_node(id, |node| node.bundle.clone())
    }

    /// Descriptor snapshot of a live instance.
    pub fn descriptor_of(&self, id: u64) -> Option<Arc<KiModuleDescriptor>> {
        self.with_node(id, |node| Arc::clone(&node.descriptor))
    }
}

impl Drop for KiInstanceTable {
    fn drop(&mut self) {
        let leaked = self.live_count();
        if leaked > 0 {
            log::warn!(
                "graph.table.leak: instance table dropped with live instances - count={}",
                leaked
            );
        }
    }
}
