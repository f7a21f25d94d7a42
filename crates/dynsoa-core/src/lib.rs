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

//! # DynSoA Core
//!
//! Foundational crate containing the plain types and contracts shared by the
//! DynSoA runtime: schema descriptors, layout kinds, metric samples and
//! aggregates, retile plans, scheduling policies, and the learned gain-model
//! coefficients.

#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod kernel;
pub mod layout;
pub mod schema;
pub mod telemetry;
pub mod utils;

pub use config::{Config, Device};
pub use control::{LearnState, Policy, PolicyTrigger, TriggerAction};
pub use kernel::KernelCtx;
pub use layout::{LayoutKind, RetilePlan};
pub use schema::{ArchetypeDesc, ArchetypeId, ComponentDef, Field, ScalarType, ViewId};
pub use telemetry::{FrameAgg, Sample};
pub use utils::timer::Stopwatch;
