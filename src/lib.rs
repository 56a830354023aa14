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

//! # Ki Extensibility Core
//!
//! This is the library entry point for the Ki extensibility core: the
//! module registry and generic configuration/data-storage layer of the Ki
//! scientific computing framework. Independently compiled or scripted
//! modules are discovered, instantiated, configured, invoked, and torn
//! down through this crate, while arbitrary typed values flow between the
//! host and modules without the host needing compile-time knowledge of
//! every payload type.
//!
//! ## Module Overview
//!
//! - **errors**: the structured error taxonomy shared by every component
//! - **value**: the closed generic value type and its external (JSON)
//!   representation
//! - **store**: keyed value maps with reference-counted sharing between maps
//! - **numeric**: safe conversions between canonical and caller numerics
//! - **options**: typed, validated configuration slots and option sets
//! - **descriptor**: immutable module metadata and manifest parsing
//! - **abi**: the C-linkage contract for natively compiled modules
//! - **module**: the trait every module instance fulfills
//! - **loader**: native (dynamic-library) and script-hosted factories
//! - **graph**: the calculation-graph arena and instance bookkeeping
//! - **registry**: the central keyed store issuing instance IDs
//! - **handle**: move-only RAII ownership of created instances
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kix::{KiModuleRegistry, KiModuleDescriptor, KiValue};
//!
//! let mut registry = KiModuleRegistry::new();
//! registry.register(KiModuleDescriptor::load_manifest(manifest_path)?)?;
//!
//! let scf = registry.create("scf", None)?;
//! scf.change_option("iterations", KiValue::Int(50))?;
//! assert!(scf.all_required_satisfied()?);
//!
//! // A child instance inherits a copy of the parent's state bundle.
//! let gradient = registry.create("gradient", Some(scf.id()))?;
//! gradient.destroy()?;
//! scf.destroy()?;
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, KiError>`. Errors are typed and carry
//! structured context; they propagate across the registry/module boundary
//! and are reported by the host application's orchestration layer.

pub mod abi;
pub mod descriptor;
pub mod errors;
pub mod graph;
pub mod handle;
pub mod loader;
pub mod module;
pub mod numeric;
pub mod options;
pub mod registry;
pub mod store;
pub mod value;

pub use errors::{KiError, Result};
pub use value::{KiValue, KiValueTag};
pub use store::{KiSharedCache, KiStateBundle, KiValueMap};
pub use options::{
    KiNamedValidator, KiOption, KiOptionIssue, KiOptionSet, KiOptionValidator, KiSetValidator,
};
pub use descriptor::KiModuleDescriptor;
pub use abi::{KiFactoryTable, KiModuleEntryFn, KI_MODULE_ABI_VERSION, KI_MODULE_ENTRY_SYMBOL};
pub use module::KiModule;
pub use loader::{
    KiLoadedLibrary, KiNativeLoader, KiNativeModule, KiScriptArgs, KiScriptCallable,
    KI_SCRIPT_FACTORY_ARITY,
};
pub use graph::{KiGraphNode, KiInstanceTable};
pub use registry::{KiModuleRegistry, KiTestFailure};
pub use handle::KiScopedModule;
