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

//! # DynSoA Control
//!
//! The decision core of the runtime: the policy predicate evaluator, the
//! layout planner with its learned gain model, UCB1 bandit statistics, the
//! end-of-frame scheduler with its frame budget and cool-off, and the
//! persistence of learned coefficients.

#![warn(missing_docs)]

pub mod bandit;
pub mod persist;
pub mod planner;
pub mod predicate;
pub mod scheduler;

pub use bandit::{BanditBook, BanditStat};
pub use scheduler::{Scheduler, FRAME_BUDGET_US, MAX_SCHEDULED_VIEWS};
