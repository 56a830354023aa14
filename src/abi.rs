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

//! # Ki Native Module ABI
//!
//! The C-linkage contract between the registry and natively compiled
//! modules. A shared library participates by exporting one well-known
//! symbol, `CreateModule`, returning a pointer to a static
//! [`KiFactoryTable`].
//!
//! ```c
//! const KiFactoryTable *CreateModule(void);
//! ```
//!
//! Failure to resolve the symbol, or a null table result, is a load-time
//! error. The table's creation function receives the instance name and the
//! registry-assigned unique ID; the destruction function receives the same
//! ID when the instance is torn down.

use std::os::raw::{c_char, c_void};

/// Version of the factory-table layout. Bumped on any incompatible change.
pub const KI_MODULE_ABI_VERSION: u32 = 1;

/// The single well-known entry point a native module library must export.
pub const KI_MODULE_ENTRY_SYMBOL: &[u8] = b"CreateModule\0";

/// Signature of the exported entry point.
pub type KiModuleEntryFn = unsafe extern "C" fn() -> *const KiFactoryTable;

/// Factory/destructor pair exported by a native module library.
///
/// `create` returns an opaque instance pointer (null signals a creation
/// failure); `destroy` releases the instance identified by `id`. The
/// function pointers must stay valid for the lifetime of the library.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct KiFactoryTable {
    pub abi_version: u32,
    pub create: unsafe extern "C" fn(name: *const c_char, id: u64) -> *mut c_void,
    pub destroy: unsafe extern "C" fn(id: u64),
}
