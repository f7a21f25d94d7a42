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

//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compute device the runtime targets. Informational; metrics are synthetic
/// CPU defaults either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    /// Host CPU execution.
    Cpu,
    /// Accelerator execution. Accepted but treated like CPU.
    Gpu,
}

/// Options recognized by the runtime constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target device.
    pub device: Device,
    /// Default AoSoA tile for demo policies and kernel contexts.
    pub aosoa_tile: i32,
    /// Default matrix block size hint.
    pub matrix_block: i32,
    /// Per-retile latency allowance hint in microseconds. Exposed but not
    /// consulted by the applier, which uses its fixed frame budget.
    pub max_retile_us: i32,
    /// Whether the scheduler is meant to run. Exposed; the scheduler
    /// currently always evaluates at end-of-frame.
    pub scheduler_enabled: bool,
    /// Override for the learn-state persistence path. `None` keeps the
    /// default (`dynsoa_learn.json`, or `DYNSOA_LEARN_PATH` when set).
    pub persist_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            aosoa_tile: 128,
            matrix_block: 1024,
            max_retile_us: 500,
            scheduler_enabled: false,
            persist_path: None,
        }
    }
}
