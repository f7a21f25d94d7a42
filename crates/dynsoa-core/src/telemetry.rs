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

//! Metric sample and per-view aggregate types.

use crate::schema::ViewId;

/// One kernel invocation's metrics.
///
/// The kernel runner populates only `time_us`; the remaining fields default
/// to synthetic CPU values (1.0 for efficiency metrics, 0.0 for miss/
/// divergence metrics) unless the caller emits a sample explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Name of the kernel that produced this sample.
    pub kernel: String,
    /// View the kernel ran over.
    pub view: ViewId,
    /// Wall-clock kernel duration in microseconds.
    pub time_us: u32,
    /// 95th-percentile per-tile latency in microseconds.
    pub p95_tile_us: u32,
    /// 99th-percentile per-tile latency in microseconds.
    pub p99_tile_us: u32,
    /// Warp/SIMD lane efficiency in [0, 1].
    pub warp_eff: f32,
    /// Branch divergence ratio in [0, 1].
    pub branch_div: f32,
    /// Memory coalescing ratio in [0, 1].
    pub mem_coalesce: f32,
    /// L2 cache miss rate in [0, 1].
    pub l2_miss_rate: f32,
}

impl Sample {
    /// Creates a sample for `view` with default synthetic metrics.
    pub fn new(kernel: impl Into<String>, view: ViewId) -> Self {
        Self {
            kernel: kernel.into(),
            view,
            time_us: 0,
            p95_tile_us: 0,
            p99_tile_us: 0,
            warp_eff: 1.0,
            branch_div: 0.0,
            mem_coalesce: 1.0,
            l2_miss_rate: 0.0,
        }
    }
}

/// Per-view aggregate over a metrics window, plus the EWMA state shape.
///
/// `tail_ratio` is always derived: `p99_us / p95_us`, or 0 when `p95_us`
/// is 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameAgg {
    /// Mean kernel latency in microseconds.
    pub mean_us: f64,
    /// 95th-percentile per-tile latency in microseconds.
    pub p95_us: f64,
    /// 99th-percentile per-tile latency in microseconds.
    pub p99_us: f64,
    /// Warp/SIMD lane efficiency.
    pub warp_eff: f64,
    /// Branch divergence ratio.
    pub branch_div: f64,
    /// Memory coalescing ratio.
    pub mem_coalesce: f64,
    /// L2 cache miss rate.
    pub l2_miss: f64,
    /// `p99_us / p95_us`, 0 when `p95_us` is 0.
    pub tail_ratio: f64,
}

impl FrameAgg {
    /// Recomputes `tail_ratio` from the current p95/p99 values.
    pub fn refresh_tail_ratio(&mut self) {
        self.tail_ratio = if self.p95_us > 0.0 {
            self.p99_us / self.p95_us
        } else {
            0.0
        };
    }
}
