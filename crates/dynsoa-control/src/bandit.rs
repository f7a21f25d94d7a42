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

//! UCB1 bandit statistics over retile actions.

use dynsoa_core::{RetilePlan, ViewId};
use rand::Rng;
use std::collections::HashMap;

/// Welford-style running statistics of one arm's reward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BanditStat {
    /// Running mean reward.
    pub mean: f64,
    /// Sum of squared deviations.
    pub m2: f64,
    /// Number of observed rewards.
    pub n: u32,
}

impl BanditStat {
    /// Folds one reward observation into the statistics.
    pub fn update(&mut self, reward: f64) {
        self.n += 1;
        let delta = reward - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (reward - self.mean);
    }

    /// Sample variance of the observed rewards.
    pub fn var(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }
}

/// Per-(view, action) reward statistics plus the decision epoch counter.
///
/// Arms are keyed by [`RetilePlan::action_key`]. Rewards are realized
/// latency reduction minus estimated transform cost, fed in by the
/// scheduler's deferred learning pass.
#[derive(Debug, Default)]
pub struct BanditBook {
    arms: HashMap<(ViewId, i64), BanditStat>,
    t: u64,
}

impl BanditBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of selections made so far.
    pub fn epoch(&self) -> u64 {
        self.t
    }

    /// Statistics of one arm, if it has ever been rewarded.
    pub fn stat(&self, view: ViewId, key: i64) -> Option<&BanditStat> {
        self.arms.get(&(view, key))
    }

    /// Picks a candidate index by UCB1 with ε-greedy exploration.
    ///
    /// With probability `epsilon` a uniformly random candidate is returned.
    /// Otherwise each candidate scores `mean + bonus`, where the bonus is
    /// `sqrt(2·ln(max(2, t)) / n)` for visited arms and 1.0 for unvisited
    /// ones, so fresh arms dominate early. Ties keep the first-seen
    /// candidate.
    pub fn select(
        &mut self,
        view: ViewId,
        candidates: &[RetilePlan],
        epsilon: f64,
        rng: &mut impl Rng,
    ) -> usize {
        debug_assert!(!candidates.is_empty());
        self.t += 1;
        if rng.gen::<f64>() < epsilon {
            return rng.gen_range(0..candidates.len());
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best_idx = 0;
        for (idx, plan) in candidates.iter().enumerate() {
            let (mean, n) = self
                .arms
                .get(&(view, plan.action_key()))
                .map_or((0.0, 0), |s| (s.mean, s.n));
            let bonus = if n > 0 {
                (2.0 * (self.t.max(2) as f64).ln() / n as f64).sqrt()
            } else {
                1.0
            };
            let score = mean + bonus;
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Records a reward for an applied action.
    pub fn update(&mut self, view: ViewId, key: i64, reward: f64) {
        self.arms.entry((view, key)).or_default().update(reward);
    }
}
