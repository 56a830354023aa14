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

//! # Ki Module Loaders
//!
//! Resolution of a descriptor's factory, for both module origins:
//!
//! - **Native**: the shared object is opened through the OS loader
//!   (`libloading`), the well-known `CreateModule` entry point is resolved,
//!   and the resulting factory table is cached per library path. Multiple
//!   registrations referencing the same file share one open handle, and the
//!   handle stays open for as long as the loader (and any instance created
//!   from it) lives; release happens through ownership, never through
//!   manual bookkeeping.
//! - **Script**: a host-registered callable satisfying the fixed
//!   four-argument factory contract is wrapped directly. Callability is
//!   verified eagerly at registration time.

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::abi::{KiFactoryTable, KiModuleEntryFn, KI_MODULE_ABI_VERSION, KI_MODULE_ENTRY_SYMBOL};
use crate::descriptor::KiModuleDescriptor;
use crate::errors::{KiError, Result};
use crate::module::KiModule;
use crate::store::KiSharedCache;

/// An opened native module library with its resolved factory table.
///
/// The `libloading::Library` is dropped (and the OS handle closed) when the
/// last `Arc` holding it goes away; every instance created from the library
/// keeps one, so a module can never outlive its code.
#[derive(Debug)]
pub struct KiLoadedLibrary {
    path: PathBuf,
    table: KiFactoryTable,
    _library: libloading::Library,
}

impl KiLoadedLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Invokes the library's creation function for a new instance.
    ///
    /// A null result from the factory is a `ModuleCreate` error; the
    /// registry has already burned the ID, which is fine since IDs are
    /// never reused anyway.
    pub fn create_instance(self: &Arc<Self>, name: &str, id: u64) -> Result<Box<dyn KiModule>> {
        let c_name = CString::new(name).map_err(|_| {
            KiError::module_create(name, self.path.display().to_string(), "name contains NUL")
        })?;
        let raw = unsafe { (self.table.create)(c_name.as_ptr(), id) };
        if raw.is_null() {
            return Err(KiError::module_create(
                name,
                self.path.display().to_string(),
                "factory returned a null instance",
            ));
        }
        Ok(Box::new(KiNativeModule {
            name: name.to_string(),
            id,
            raw,
            destroy: self.table.destroy,
            destroyed: false,
            _library: Arc::clone(self),
        }))
    }
}

/// A module instance produced by a native factory table.
#[derive(Debug)]
pub struct KiNativeModule {
    name: String,
    id: u64,
    raw: *mut c_void,
    destroy: unsafe extern "C" fn(id: u64),
    destroyed: bool,
    _library: Arc<KiLoadedLibrary>,
}

// The ABI contract requires native instances to be callable from whichever
// thread currently drives the registry; the raw pointer is only ever touched
// through this wrapper.
unsafe impl Send for KiNativeModule {}

impl KiNativeModule {
    /// The opaque instance pointer handed out by the native factory.
    pub fn raw(&self) -> *mut c_void {
        self.raw
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl KiModule for KiNativeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.destroyed {
            self.destroyed = true;
            unsafe { (self.destroy)(self.id) };
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl Drop for KiNativeModule {
    fn drop(&mut self) {
        // Leaked handles (a table dropped with live slots) still release the
        // native side.
        if !self.destroyed {
            log::warn!(
                "loader.native.drop_without_shutdown: releasing native instance from Drop - module={}, id={}",
                self.name,
                self.id
            );
            self.destroyed = true;
            unsafe { (self.destroy)(self.id) };
        }
    }
}

/// Loader for natively compiled modules, with a per-path library cache.
#[derive(Debug, Default)]
pub struct KiNativeLoader {
    libraries: HashMap<PathBuf, Arc<KiLoadedLibrary>>,
}

impl KiNativeLoader {
    pub fn new() -> Self {
        KiNativeLoader {
            libraries: HashMap::new(),
        }
    }

    /// Resolves the factory table for the library at `path`, reusing an
    /// already-open handle when present.
    ///
    /// On a fresh open: an OS loader failure, a missing `CreateModule`
    /// symbol, a null table, or an ABI version mismatch each raise a
    /// `ModuleLoad` error carrying the path and the loader's diagnostic.
    /// A failed open leaves no handle behind.
    pub fn resolve(&mut self, path: &Path) -> Result<Arc<KiLoadedLibrary>> {
        if let Some(loaded) = self.libraries.get(path) {
            return Ok(Arc::clone(loaded));
        }

        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            KiError::module_load(path.display().to_string(), format!("cannot open library: {}", e))
        })?;

        let entry: KiModuleEntryFn = {
            let symbol: libloading::Symbol<'_, KiModuleEntryFn> =
                unsafe { library.get(KI_MODULE_ENTRY_SYMBOL) }.map_err(|e| {
                    KiError::module_load(
                        path.display().to_string(),
                        format!("cannot resolve symbol 'CreateModule': {}", e),
                    )
                })?;
            *symbol
        };

        let table_ptr = unsafe { entry() };
        if table_ptr.is_null() {
            return Err(KiError::module_load(
                path.display().to_string(),
                "'CreateModule' returned a null factory table",
            ));
        }
        let table = unsafe { *table_ptr };
        if table.abi_version != KI_MODULE_ABI_VERSION {
            return Err(KiError::module_load(
                path.display().to_string(),
                format!(
                    "factory table declares ABI version {} but this core speaks {}",
                    table.abi_version, KI_MODULE_ABI_VERSION
                ),
            ));
        }

        log::info!(
            "loader.native.open: library opened and factory table resolved - path={}, abi_version={}",
            path.display(),
            table.abi_version
        );

        let loaded = Arc::new(KiLoadedLibrary {
            path: path.to_path_buf(),
            table,
            _library: library,
        });
        self.libraries.insert(path.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// True when a library handle for `path` is already open.
    pub fn is_open(&self, path: &Path) -> bool {
        self.libraries.contains_key(path)
    }

    pub fn open_count(&self) -> usize {
        self.libraries.len()
    }
}

/// Number of positional arguments a script-hosted factory must accept.
pub const KI_SCRIPT_FACTORY_ARITY: usize = 4;

/// The positional arguments handed to a script-hosted factory:
/// the instance name, the assigned unique ID, the per-identity shared
/// cache, and the descriptor the instance is created from.
pub struct KiScriptArgs<'a> {
    pub name: &'a str,
    pub id: u64,
    pub cache: &'a KiSharedCache,
    pub descriptor: &'a KiModuleDescriptor,
}

/// Boxed factory behind a script-hosted callable.
pub type KiScriptFactoryFn =
    dyn Fn(KiScriptArgs<'_>) -> Result<Box<dyn KiModule>> + Send + Sync;

/// A script-hosted callable wrapped as a module factory.
///
/// The callable declares the arity it was registered with; registration
/// verifies it against the fixed factory contract before first use.
#[derive(Clone)]
pub struct KiScriptCallable {
    arity: usize,
    func: Arc<KiScriptFactoryFn>,
}

impl KiScriptCallable {
    pub fn new<F>(arity: usize, func: F) -> Self
    where
        F: Fn(KiScriptArgs<'_>) -> Result<Box<dyn KiModule>> + Send + Sync + 'static,
    {
        KiScriptCallable {
            arity,
            func: Arc::new(func),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Eager callability check, performed at registration time.
    pub fn verify(&self, key: &str) -> Result<()> {
        if self.arity != KI_SCRIPT_FACTORY_ARITY {
            return Err(KiError::module_load(
                format!("script:{}", key),
                format!(
                    "script factory must accept exactly {} positional arguments, callable declares {}",
                    KI_SCRIPT_FACTORY_ARITY, self.arity
                ),
            ));
        }
        Ok(())
    }

    pub fn invoke(&self, args: KiScriptArgs<'_>) -> Result<Box<dyn KiModule>> {
        (self.func)(args)
    }
}

impl fmt::Debug for KiScriptCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KiScriptCallable")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
