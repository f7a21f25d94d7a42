// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # DynSoA SDK
//!
//! The public-facing surface of the DynSoA runtime. Applications create a
//! [`Runtime`], register schemas, spawn entity populations, and drive
//! frames; between frames the runtime observes kernel timing and may
//! transform the physical layout of view storage to reduce tail latency.

#![warn(missing_docs)]

mod runtime;

pub use runtime::Runtime;

/// Commonly used types, re-exported for application code.
pub mod prelude {
    pub use crate::Runtime;
    pub use dynsoa_core::{
        Config, Device, Field, KernelCtx, LayoutKind, LearnState, Policy, PolicyTrigger,
        RetilePlan, Sample, ScalarType, TriggerAction,
    };
    pub use dynsoa_core::{ArchetypeId, ComponentDef, FrameAgg, ViewId};
    pub use dynsoa_data::{MatrixBlock, SpawnRow, View};
}
