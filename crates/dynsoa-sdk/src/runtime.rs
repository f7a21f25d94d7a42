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

//! The owned runtime context and the kernel runner.

use dynsoa_control::{planner, Scheduler};
use dynsoa_core::{
    ArchetypeId, ComponentDef, Config, FrameAgg, KernelCtx, LayoutKind, LearnState, Policy,
    PolicyTrigger, Sample, ScalarType, Stopwatch, TriggerAction, ViewId,
};
use dynsoa_data::{EntityStore, MatrixBlock, SchemaRegistry, SpawnRow, View};
use dynsoa_telemetry::MetricsHub;
use std::path::Path;

/// The runtime context owning every subsystem: schema registry, entity
/// store, metrics hub, and scheduler.
///
/// All state that the original design kept in process-wide singletons lives
/// here, so independent runtimes can coexist (and be tested) in one
/// process. One logical thread is expected to own the runtime; only metric
/// emission is internally synchronized, because kernels may be threaded by
/// the caller.
pub struct Runtime {
    config: Config,
    schema: SchemaRegistry,
    store: EntityStore,
    metrics: MetricsHub,
    scheduler: Scheduler,
}

impl Runtime {
    /// Creates a runtime and loads previously persisted learn-state
    /// weights.
    ///
    /// The persistence path comes from `config.persist_path` when set,
    /// falling back to `dynsoa_learn.json`; the `DYNSOA_LEARN_PATH`
    /// environment variable overrides both.
    pub fn new(config: Config) -> Self {
        let mut scheduler = Scheduler::new();
        if let Some(path) = &config.persist_path {
            scheduler.set_persist_path(path.clone());
        }
        scheduler.load_state();
        log::info!(
            "dynsoa: runtime up (device {:?}, tile {}, block {})",
            config.device,
            config.aosoa_tile,
            config.matrix_block
        );
        Self {
            config,
            schema: SchemaRegistry::new(),
            store: EntityStore::new(),
            metrics: MetricsHub::new(),
            scheduler,
        }
    }

    /// Persists the learned weights and tears the runtime down.
    ///
    /// A runtime created afterwards starts from the persisted state.
    pub fn shutdown(self) {
        self.scheduler.save_state();
        log::info!("dynsoa: runtime down");
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Schema ───────────────────────────────────────────────────────

    /// Inserts or overwrites a component definition.
    pub fn define_component(&mut self, component: ComponentDef) {
        self.schema.define_component(component);
    }

    /// Defines an archetype over the named components and returns its
    /// 1-based id.
    pub fn define_archetype(&mut self, name: &str, components: &[&str]) -> ArchetypeId {
        self.schema.define_archetype(name, components)
    }

    /// The schema registry, for inspection.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    // ── Storage ──────────────────────────────────────────────────────

    /// Spawns a population of `count` entities anchored to `archetype`.
    pub fn spawn(
        &mut self,
        archetype: ArchetypeId,
        count: usize,
        init_fn: Option<&mut dyn FnMut(usize, &mut SpawnRow)>,
    ) -> ViewId {
        self.store.spawn(archetype, count, init_fn)
    }

    /// Id of the most recent view of `archetype`, creating an empty view
    /// when none exists.
    pub fn make_view(&mut self, archetype: ArchetypeId) -> ViewId {
        self.store.make_view(archetype)
    }

    /// Number of entities in a view; 0 for unknown ids.
    pub fn view_len(&self, view: ViewId) -> usize {
        self.store.view_len(view)
    }

    /// Current layout label of a view.
    pub fn layout(&self, view: ViewId) -> Option<LayoutKind> {
        self.store.layout(view)
    }

    /// Borrows a view.
    pub fn view(&self, view: ViewId) -> Option<&View> {
        self.store.view(view)
    }

    /// Mutably borrows a view, e.g. to initialize columns after `spawn`.
    pub fn view_mut(&mut self, view: ViewId) -> Option<&mut View> {
        self.store.view_mut(view)
    }

    /// Typed read access to a column.
    pub fn column_f32(&self, view: ViewId, path: &str) -> Option<&[f32]> {
        self.store.view(view)?.column_f32(path)
    }

    /// Typed write access to a column.
    pub fn column_f32_mut(&mut self, view: ViewId, path: &str) -> Option<&mut [f32]> {
        self.store.view_mut(view)?.column_f32_mut(path)
    }

    /// Declares an extra zero-initialized column on a view.
    pub fn add_column(&mut self, view: ViewId, path: &str, ty: ScalarType) -> bool {
        self.store.add_column(view, path, ty)
    }

    /// Packs selected columns over a row range into a transient
    /// column-major block.
    pub fn acquire_matrix_block(
        &self,
        view: ViewId,
        paths: &[&str],
        rows: usize,
        offset: usize,
    ) -> Option<MatrixBlock> {
        self.store.acquire_matrix_block(view, paths, rows, offset)
    }

    /// Releases a block, optionally writing its cells back to the source
    /// columns.
    pub fn release_matrix_block(&mut self, view: ViewId, block: MatrixBlock, write_back: bool) {
        self.store.release_matrix_block(view, block, write_back)
    }

    // ── Retile helpers ───────────────────────────────────────────────

    /// Migrates a view back to SoA.
    pub fn retile_to_soa(&mut self, view: ViewId) -> bool {
        planner::retile_to_soa(&mut self.store, view)
    }

    /// Plans and applies an AoSoA retile with the given tile.
    pub fn retile_aosoa(&mut self, view: ViewId, tile: i32) -> bool {
        let plan = planner::plan_aosoa(
            &self.store,
            &self.metrics,
            &self.scheduler.learn_state(),
            view,
            tile,
        );
        planner::retile(&mut self.store, view, &plan)
    }

    // ── Frames ───────────────────────────────────────────────────────

    /// Opens a frame.
    pub fn begin_frame(&mut self) {
        self.scheduler.on_begin_frame();
    }

    /// Times a user kernel over a view and emits its sample.
    ///
    /// The kernel receives the view's columns and the per-frame context;
    /// the runner neither inspects nor parallelizes it. The elapsed wall
    /// clock lands in the sample's `time_us`, with the remaining metrics
    /// at their synthetic defaults.
    pub fn run_kernel<F>(&mut self, name: &str, view: ViewId, ctx: &KernelCtx, mut kernel: F)
    where
        F: FnMut(&mut View, &KernelCtx),
    {
        let watch = Stopwatch::new();
        if let Some(v) = self.store.view_mut(view) {
            kernel(v, ctx);
        }
        let mut sample = Sample::new(name, view);
        sample.time_us = watch.elapsed_us() as u32;

        self.metrics.emit(&sample);
        self.metrics.note_frame_end(view, &sample);
    }

    /// Closes a frame: scheduler evaluation, budgeted retile application,
    /// and any deferred learning updates that have come due.
    pub fn end_frame(&mut self) {
        self.scheduler.on_end_frame(&mut self.store, &self.metrics);
    }

    // ── Policy ───────────────────────────────────────────────────────

    /// Installs the demo policy: one always-true trigger retiling to AoSoA
    /// with the configured tile, priority 1.0, cool-off 2.
    ///
    /// The policy text is currently ignored; use
    /// [`install_policy`](Self::install_policy) for real trigger sets.
    pub fn set_policy(&mut self, _text: &str) {
        let demo = Policy {
            triggers: vec![PolicyTrigger {
                when: "mean_us >= 0".to_string(),
                action: TriggerAction::RetileAosoa,
                arg: self.config.aosoa_tile,
                priority: 1.0,
            }],
            cooloff_frames: 2,
            ..Policy::default()
        };
        self.scheduler.set_policy(demo);
    }

    /// Installs a policy directly.
    pub fn install_policy(&mut self, policy: Policy) {
        self.scheduler.set_policy(policy);
    }

    // ── Metrics ──────────────────────────────────────────────────────

    /// (Re)opens the metrics CSV sink.
    pub fn metrics_enable_csv(&self, path: &Path) {
        self.metrics.enable_csv(path);
    }

    /// Emits a sample directly, e.g. from instrumentation outside the
    /// kernel runner.
    pub fn emit_metric(&self, sample: &Sample) {
        self.metrics.emit(sample);
    }

    /// Folds a frame-closing sample into a view's EWMA.
    pub fn note_frame_end(&self, view: ViewId, sample: &Sample) {
        self.metrics.note_frame_end(view, sample);
    }

    /// Aggregates the last up-to-`window_frames` samples of a view.
    pub fn aggregate(&self, view: ViewId, window_frames: usize) -> FrameAgg {
        self.metrics.aggregate(view, window_frames)
    }

    /// The current EWMA aggregate of a view.
    pub fn ewma(&self, view: ViewId) -> Option<FrameAgg> {
        self.metrics.ewma(view)
    }

    // ── Introspection ────────────────────────────────────────────────

    /// The learned gain-model coefficients.
    pub fn learn_state(&self) -> LearnState {
        self.scheduler.learn_state()
    }

    /// Total retile actions the scheduler has applied.
    pub fn actions_applied(&self) -> u64 {
        self.scheduler.actions_applied()
    }

    /// Pins the scheduler's exploration probability (tests use 0).
    pub fn set_exploration(&mut self, epsilon: f64) {
        self.scheduler.set_epsilon(epsilon);
    }
}
