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

//! Context handed to user compute kernels.

/// Per-invocation parameters passed to a kernel alongside its view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelCtx {
    /// Simulation timestep in seconds.
    pub dt: f32,
    /// The tile size the runtime currently favors for this workload.
    pub tile: i32,
}

impl KernelCtx {
    /// Creates a kernel context.
    pub fn new(dt: f32, tile: i32) -> Self {
        Self { dt, tile }
    }
}
