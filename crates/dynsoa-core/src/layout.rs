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

//! Physical layout kinds and retile plans.

use serde::{Deserialize, Serialize};

/// The physical organization of a view's column storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LayoutKind {
    /// Array-of-Structures. Declared for completeness; no transform targets it.
    AoS = 0,
    /// Structure-of-Arrays: one contiguous buffer per column.
    SoA = 1,
    /// Tiled SoA: columns are organized in tiles of a fixed element count.
    AoSoA = 2,
    /// Transient column-major block mode; never a persistent storage layout.
    Matrix = 3,
}

impl LayoutKind {
    /// Stable numeric code, used for action keys and trace rows.
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

/// A planned layout transformation with its cost/gain estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetilePlan {
    /// Target layout.
    pub to: LayoutKind,
    /// AoSoA tile or matrix block size, depending on `to`.
    pub tile_or_block: i32,
    /// Estimated migration cost in microseconds.
    pub est_cost_us: f64,
    /// Estimated latency gain in microseconds.
    pub est_gain_us: f64,
}

impl Default for RetilePlan {
    fn default() -> Self {
        Self {
            to: LayoutKind::SoA,
            tile_or_block: 0,
            est_cost_us: 0.0,
            est_gain_us: 0.0,
        }
    }
}

impl RetilePlan {
    /// Key identifying this plan as a bandit arm: `to·100000 + tile_or_block`.
    pub fn action_key(&self) -> i64 {
        self.to.code() * 100_000 + self.tile_or_block as i64
    }
}
