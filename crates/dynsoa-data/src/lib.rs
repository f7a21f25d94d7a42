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

//! # DynSoA Data
//!
//! Columnar entity storage for the DynSoA runtime: the schema registry,
//! views with named columns, transient matrix blocks, and the SoA ↔ AoSoA
//! layout transforms the scheduler applies between frames.

#![warn(missing_docs)]

mod block;
mod column;
mod schema;
mod store;
mod view;

pub use block::MatrixBlock;
pub use column::Column;
pub use schema::SchemaRegistry;
pub use store::{EntityStore, SpawnRow};
pub use view::View;
