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

//! Retile plan construction and application.
//!
//! Costs are modeled as `bytes_to_move / mem_bw` against a fixed bandwidth
//! heuristic; gains come from the learned three-term model over the view's
//! recent aggregate.

use dynsoa_core::{FrameAgg, LayoutKind, LearnState, RetilePlan, ViewId};
use dynsoa_data::EntityStore;
use dynsoa_telemetry::MetricsHub;

/// Effective migration bandwidth heuristic, in bytes per microsecond.
pub const MEM_BW_BYTES_PER_US: f64 = 4096.0;

/// Window (in samples) the planner aggregates over.
pub const PLAN_WINDOW: usize = 3;

/// Branch divergence below this contributes no gain.
const DIV_FLOOR: f64 = 0.15;
/// Coalescing above this contributes no gain.
const MEM_TARGET: f64 = 0.75;
/// Tail ratios below this contribute no gain.
const TAIL_FLOOR: f64 = 1.10;

/// The three gain-model terms of the AoSoA plan, also used by the learner.
pub fn aosoa_gain_terms(agg: &FrameAgg) -> (f64, f64, f64) {
    (
        (agg.branch_div - DIV_FLOOR).max(0.0),
        (MEM_TARGET - agg.mem_coalesce).max(0.0),
        (agg.tail_ratio - TAIL_FLOOR).max(0.0),
    )
}

/// Builds an AoSoA retile plan for `view` with the given tile.
pub fn plan_aosoa(
    store: &EntityStore,
    metrics: &MetricsHub,
    learn: &LearnState,
    view: ViewId,
    tile: i32,
) -> RetilePlan {
    let mut plan = RetilePlan {
        to: LayoutKind::AoSoA,
        tile_or_block: tile,
        ..Default::default()
    };
    let bytes = store.bytes_to_move(view) as f64;
    plan.est_cost_us = bytes / MEM_BW_BYTES_PER_US;

    let agg = metrics.aggregate(view, PLAN_WINDOW);
    let (div_term, mem_term, tail_term) = aosoa_gain_terms(&agg);
    let base = if agg.p95_us > 0.0 {
        agg.p95_us
    } else if agg.mean_us > 0.0 {
        agg.mean_us
    } else {
        500.0
    };

    let gain = base * (learn.a_div * div_term + learn.a_mem * mem_term + learn.a_tail * tail_term);
    plan.est_gain_us = gain.min(base * 0.35).max(30.0);
    plan
}

/// Builds a transient matrix-block plan for `view` with the given block size.
pub fn plan_matrix(
    store: &EntityStore,
    metrics: &MetricsHub,
    learn: &LearnState,
    view: ViewId,
    block: i32,
) -> RetilePlan {
    let mut plan = RetilePlan {
        to: LayoutKind::Matrix,
        tile_or_block: block,
        ..Default::default()
    };
    let bytes = store.bytes_to_move(view) as f64;
    plan.est_cost_us = 0.25 * (bytes / MEM_BW_BYTES_PER_US);

    let agg = metrics.aggregate(view, PLAN_WINDOW);
    let mem_term = (0.80 - agg.mem_coalesce).max(0.0);
    let base = if agg.mean_us > 0.0 { agg.mean_us } else { 400.0 };

    let gain = base * (0.8 * learn.a_mem) * mem_term;
    plan.est_gain_us = gain.min(base * 0.20).max(15.0);
    plan
}

/// The fixed candidate set considered per decision epoch: three AoSoA
/// tiles and one matrix block.
pub fn catalog_actions(
    store: &EntityStore,
    metrics: &MetricsHub,
    learn: &LearnState,
    view: ViewId,
) -> Vec<RetilePlan> {
    vec![
        plan_aosoa(store, metrics, learn, view, 64),
        plan_aosoa(store, metrics, learn, view, 128),
        plan_aosoa(store, metrics, learn, view, 256),
        plan_matrix(store, metrics, learn, view, 64),
    ]
}

/// Applies a plan to persistent storage.
///
/// A `Matrix` target is a no-op here — matrix blocks are transient and go
/// through acquire/release. `AoS` is declared but has no transform.
pub fn retile(store: &mut EntityStore, view: ViewId, plan: &RetilePlan) -> bool {
    match plan.to {
        LayoutKind::AoSoA => {
            if plan.tile_or_block <= 0 {
                return false;
            }
            store.transform_soa_to_aosoa(view, plan.tile_or_block as u32)
        }
        LayoutKind::SoA => store.transform_aosoa_to_soa(view),
        LayoutKind::Matrix => true,
        LayoutKind::AoS => false,
    }
}

/// Migrates a view back to SoA.
pub fn retile_to_soa(store: &mut EntityStore, view: ViewId) -> bool {
    store.transform_aosoa_to_soa(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynsoa_core::Sample;

    fn fixture(rows: usize) -> (EntityStore, MetricsHub, LearnState, ViewId) {
        let mut store = EntityStore::new();
        let view = store.spawn(1, rows, None);
        (store, MetricsHub::new(), LearnState::default(), view)
    }

    #[test]
    fn aosoa_cost_is_bytes_over_bandwidth() {
        let (store, metrics, learn, v) = fixture(4096);
        let plan = plan_aosoa(&store, &metrics, &learn, v, 128);
        let bytes = (6 * 4096 * 4) as f64;
        assert!((plan.est_cost_us - bytes / MEM_BW_BYTES_PER_US).abs() < 1e-9);
        assert_eq!(plan.to, LayoutKind::AoSoA);
        assert_eq!(plan.tile_or_block, 128);
    }

    #[test]
    fn aosoa_gain_floors_at_30_without_signals() {
        // No samples: base falls back to 500, all terms are zero, and the
        // raw gain of 0 clamps up to the floor.
        let (store, metrics, learn, v) = fixture(64);
        let plan = plan_aosoa(&store, &metrics, &learn, v, 64);
        assert_eq!(plan.est_gain_us, 30.0);
    }

    #[test]
    fn aosoa_gain_is_capped_at_35_percent_of_base() {
        let (store, metrics, v) = {
            let (s, m, _, v) = fixture(64);
            (s, m, v)
        };
        // Saturated weights and strong divergence/tail signals.
        let learn = LearnState {
            a_div: 0.25,
            a_mem: 0.25,
            a_tail: 0.25,
        };
        let mut s = Sample::new("k", v);
        s.time_us = 10_000;
        s.p95_tile_us = 10_000;
        s.p99_tile_us = 30_000;
        s.branch_div = 1.0;
        s.mem_coalesce = 0.0;
        metrics.emit(&s);

        let plan = plan_aosoa(&store, &metrics, &learn, v, 64);
        assert!((plan.est_gain_us - 0.35 * 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn aosoa_base_prefers_p95_then_mean() {
        let saturated = LearnState {
            a_div: 0.25,
            a_mem: 0.25,
            a_tail: 0.25,
        };

        // With p95 present, the gain cap is 35% of p95, not of the mean.
        let (store, metrics, _, v) = fixture(64);
        let mut s = Sample::new("k", v);
        s.time_us = 9000;
        s.p95_tile_us = 1000;
        s.p99_tile_us = 3000;
        s.branch_div = 1.0;
        s.mem_coalesce = 0.0;
        metrics.emit(&s);
        let plan = plan_aosoa(&store, &metrics, &saturated, v, 64);
        assert!((plan.est_gain_us - 0.35 * 1000.0).abs() < 1e-9);

        // Without p95, the windowed mean takes its place.
        let (store2, metrics2, _, v2) = fixture(64);
        let mut s2 = Sample::new("k", v2);
        s2.time_us = 2000;
        s2.branch_div = 1.0;
        s2.mem_coalesce = 0.0;
        metrics2.emit(&s2);
        let plan2 = plan_aosoa(&store2, &metrics2, &saturated, v2, 64);
        assert!((plan2.est_gain_us - 0.35 * 2000.0).abs() < 1e-9);
    }

    #[test]
    fn matrix_plan_quarters_the_cost() {
        let (store, metrics, learn, v) = fixture(4096);
        let aosoa = plan_aosoa(&store, &metrics, &learn, v, 64);
        let matrix = plan_matrix(&store, &metrics, &learn, v, 64);
        assert!((matrix.est_cost_us - 0.25 * aosoa.est_cost_us).abs() < 1e-9);
        assert_eq!(matrix.to, LayoutKind::Matrix);
    }

    #[test]
    fn matrix_gain_floors_at_15() {
        let (store, metrics, learn, v) = fixture(64);
        let plan = plan_matrix(&store, &metrics, &learn, v, 64);
        // No samples: base falls back to 400 and the zeroed aggregate gives
        // a mem term of 0.8, leaving the raw gain (10.24) under the floor.
        let raw = 400.0 * 0.8 * learn.a_mem * 0.8;
        assert!(raw < 15.0);
        assert_eq!(plan.est_gain_us, 15.0);
    }

    #[test]
    fn retile_dispatches_by_target() {
        let (mut store, metrics, learn, v) = fixture(64);
        let plan = plan_aosoa(&store, &metrics, &learn, v, 64);
        assert!(retile(&mut store, v, &plan));
        assert_eq!(store.layout(v), Some(LayoutKind::AoSoA));

        assert!(retile_to_soa(&mut store, v));
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));

        let matrix = plan_matrix(&store, &metrics, &learn, v, 64);
        assert!(retile(&mut store, v, &matrix));
        // Matrix is transient only; the persistent layout is untouched.
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));
    }

    #[test]
    fn retile_rejects_nonpositive_tiles() {
        let (mut store, _, _, v) = fixture(64);
        let plan = RetilePlan {
            to: LayoutKind::AoSoA,
            tile_or_block: 0,
            ..Default::default()
        };
        assert!(!retile(&mut store, v, &plan));
    }
}
