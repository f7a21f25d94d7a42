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

//! # DynSoA Telemetry
//!
//! The metrics pipeline: per-kernel sample ingestion into bounded per-view
//! windows, exponentially weighted moving averages, windowed aggregation for
//! the scheduler, and an optional CSV sink.

#![warn(missing_docs)]

mod hub;
mod sink;

pub use hub::{MetricsHub, EWMA_ALPHA, WINDOW_CAP};
