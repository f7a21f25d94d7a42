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

//! A boids-style demo workload driving the DynSoA runtime.
//!
//! Knobs: `DYNSOA_ENTITIES` (population, default 100 000) and
//! `DYNSOA_FRAMES` (frame count, default 300). The usual runtime variables
//! (`DYNSOA_VERBOSE`, `DYNSOA_LEARN_LOG`, `DYNSOA_LEARN_PATH`) apply.

use anyhow::Result;
use dynsoa_sdk::prelude::*;
use std::path::Path;

const AVOID: u32 = 1 << 0;
const HIGH_ENERGY: u32 = 1 << 3;

fn env_usize(name: &str, fallback: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Integrates positions and applies flag-dependent damping. The per-flag
/// branches are what gives the scheduler a divergent workload to chew on.
fn boids_step(view: &mut View, ctx: &KernelCtx) {
    let n = view.len();
    for (pos, vel) in [
        ("Position.x", "Velocity.vx"),
        ("Position.y", "Velocity.vy"),
        ("Position.z", "Velocity.vz"),
    ] {
        let Some((p, v)) = view.column_pair_mut(pos, vel) else {
            return;
        };
        let (p, v) = (p.as_f32_mut(), v.as_f32());
        for i in 0..n {
            p[i] += v[i] * ctx.dt;
        }
    }

    let Some((flags_col, px_col)) = view.column_pair_mut("Flags.mask", "Position.x") else {
        return;
    };
    let (flags, px) = (flags_col.as_u32(), px_col.as_f32_mut());
    for i in 0..n {
        if flags[i] & AVOID != 0 {
            px[i] *= 0.97;
        } else if flags[i] & HIGH_ENERGY != 0 {
            px[i] *= 1.01;
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let entities = env_usize("DYNSOA_ENTITIES", 100_000);
    let frames = env_usize("DYNSOA_FRAMES", 300);

    let config = Config::default();
    let tile = config.aosoa_tile;
    let mut rt = Runtime::new(config);

    rt.define_component(ComponentDef::new(
        "Position",
        vec![
            Field::new("x", ScalarType::F32),
            Field::new("y", ScalarType::F32),
            Field::new("z", ScalarType::F32),
        ],
    ));
    rt.define_component(ComponentDef::new(
        "Velocity",
        vec![
            Field::new("vx", ScalarType::F32),
            Field::new("vy", ScalarType::F32),
            Field::new("vz", ScalarType::F32),
        ],
    ));
    rt.define_component(ComponentDef::new(
        "Flags",
        vec![Field::new("mask", ScalarType::U32)],
    ));
    let arch = rt.define_archetype("Boid", &["Position", "Velocity", "Flags"]);

    rt.spawn(arch, entities, None);
    let view = rt.make_view(arch);
    rt.add_column(view, "Flags.mask", ScalarType::U32);

    // Seed a spread-out population with a mix of behavior flags.
    {
        let v = rt.view_mut(view).expect("view just created");
        if let Some(vx) = v.column_f32_mut("Velocity.vx") {
            for (i, x) in vx.iter_mut().enumerate() {
                *x = ((i % 17) as f32 - 8.0) * 0.25;
            }
        }
        if let Some(flags) = v.column_u32_mut("Flags.mask") {
            for (i, mask) in flags.iter_mut().enumerate() {
                *mask = match i % 5 {
                    0 => AVOID,
                    3 => HIGH_ENERGY,
                    _ => 0,
                };
            }
        }
    }

    rt.metrics_enable_csv(Path::new("metrics_internal.csv"));
    rt.set_policy("{}");

    let ctx = KernelCtx::new(0.016, tile);
    let mut retiles = 0u64;
    for frame in 0..frames {
        let layout_before = rt.layout(view);

        rt.begin_frame();
        rt.run_kernel("boids_step", view, &ctx, boids_step);
        rt.end_frame();

        let layout_after = rt.layout(view);
        if layout_before != layout_after {
            retiles += 1;
            log::info!(
                "sandbox: frame {frame}: layout {:?} -> {:?}",
                layout_before,
                layout_after
            );
        }
        if frame % 60 == 0 {
            let agg = rt.aggregate(view, 3);
            log::info!(
                "sandbox: frame {frame}, {entities} entities, mean {:.1}us, layout {:?}",
                agg.mean_us,
                layout_after
            );
        }
    }

    // Exercise the transient block path once before shutting down.
    if let Some(block) = rt.acquire_matrix_block(view, &["Position.x", "Velocity.vx"], 1024, 0) {
        rt.release_matrix_block(view, block, false);
    }

    log::info!(
        "sandbox: ran boids_step on {} entities for {frames} frames ({retiles} retiles)",
        rt.view_len(view)
    );
    rt.shutdown();
    Ok(())
}
