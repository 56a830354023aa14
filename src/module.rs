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

//! # Ki Module Trait
//!
//! The contract every module instance fulfills, whatever its origin
//! (natively compiled shared object or script-hosted callable).
//!
//! Destruction goes through [`KiModule::shutdown`], invoked exactly once by
//! the owning registry slot. There is no secondary ID-to-destructor table to
//! keep synchronized; the instance that exists is the instance that will be
//! shut down.

use std::any::Any;

use crate::errors::Result;

/// A created, running module instance.
///
/// Instances exchange data with the host and with each other exclusively
/// through [`crate::value::KiValue`] containers; domain-specific methods are
/// reached by downcasting through [`as_any`](KiModule::as_any) on a typed
/// handle.
pub trait KiModule: Send + std::fmt::Debug {
    /// Instance name, usually the descriptor's display name.
    fn name(&self) -> &str;

    /// Releases the instance's resources. Called exactly once, after the
    /// registry has already removed the instance from its bookkeeping; a
    /// failure here surfaces as a `ModuleDestroy` error but can no longer
    /// corrupt registry state.
    fn shutdown(&mut self) -> Result<()>;

    /// Concrete-type access for typed module handles.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete-type access for typed module handles.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
