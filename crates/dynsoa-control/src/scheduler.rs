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

//! The end-of-frame scheduler: policy evaluation, budgeted retile
//! application with per-view cool-off, and the deferred online learner.

use crate::bandit::BanditBook;
use crate::planner;
use crate::predicate;
use crate::persist;
use dynsoa_core::{LayoutKind, LearnState, Policy, RetilePlan, TriggerAction, ViewId};
use dynsoa_data::EntityStore;
use dynsoa_telemetry::MetricsHub;
use rand::{rngs::StdRng, SeedableRng};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Total estimated retile cost admitted per frame, in microseconds.
pub const FRAME_BUDGET_US: f64 = 200_000.0;

/// Highest view id the end-of-frame applier scans.
pub const MAX_SCHEDULED_VIEWS: ViewId = 64;

/// Candidates scoring at or below this are discarded.
const SCORE_FLOOR: f64 = 0.05;
/// Samples aggregated per decision.
const AGG_WINDOW: usize = 3;
/// Frames between an applied action and its learning update.
const LEARN_DELAY_FRAMES: u64 = 2;
/// Gradient step size of the online learner.
const LEARN_RATE: f64 = 0.10;
/// Upper clamp of every learned weight.
const WEIGHT_CEIL: f64 = 0.25;
/// Default exploration probability of the UCB selection.
const DEFAULT_EPSILON: f64 = 0.05;

const LEARN_LOG_HEADER: &str = "frame,view,phase,action,to,tile,cost_us,gain_est_us,score,\
base_us,post_us,realized_us,a_div,a_mem,a_tail,a_div_new,a_mem_new,a_tail_new";

fn action_name(to: LayoutKind) -> &'static str {
    match to {
        LayoutKind::AoSoA => "RETILE_AOSOA",
        LayoutKind::SoA => "RETILE_SOA",
        LayoutKind::Matrix => "PACK_MATRIX",
        LayoutKind::AoS => "UNKNOWN",
    }
}

/// Best-effort per-decision trace CSV (`DYNSOA_LEARN_LOG`).
struct TraceSink {
    writer: BufWriter<File>,
}

impl TraceSink {
    fn create(path: &Path) -> Option<Self> {
        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("scheduler: failed to open learn log {}: {e}", path.display());
                return None;
            }
        };
        let mut writer = BufWriter::new(file);
        let _ = writeln!(writer, "{LEARN_LOG_HEADER}");
        let _ = writer.flush();
        Some(Self { writer })
    }

    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.writer, "{line}");
        let _ = self.writer.flush();
    }
}

struct Candidate {
    view: ViewId,
    plan: RetilePlan,
    score: f64,
}

/// An applied action awaiting its deferred learning update.
struct PendingAction {
    baseline: f64,
    frame: u64,
    key: i64,
    est_cost_us: f64,
}

/// Admits candidates in order while their cumulative estimated cost stays
/// within the budget; returns the admitted indices.
fn admit_within_budget(candidates: &[Candidate], budget_us: f64) -> Vec<usize> {
    let mut used = 0.0;
    let mut admitted = Vec::new();
    for (idx, c) in candidates.iter().enumerate() {
        if used + c.plan.est_cost_us <= budget_us {
            used += c.plan.est_cost_us;
            admitted.push(idx);
        }
    }
    admitted
}

/// Scheduler state: current policy, per-view cool-off and pending learning
/// records, bandit statistics, and the learned coefficients.
pub struct Scheduler {
    policy: Policy,
    frame_idx: u64,
    cooldown: HashMap<ViewId, u32>,
    pending: HashMap<ViewId, PendingAction>,
    bandit: BanditBook,
    learn: LearnState,
    persist_path: PathBuf,
    epsilon: f64,
    rng: StdRng,
    verbose: bool,
    trace: Option<TraceSink>,
    actions_applied: u64,
}

impl Scheduler {
    /// Creates a scheduler with default state, honoring `DYNSOA_VERBOSE`
    /// and `DYNSOA_LEARN_LOG`.
    pub fn new() -> Self {
        let verbose = std::env::var("DYNSOA_VERBOSE")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map_or(false, |n| n != 0);
        let trace = std::env::var("DYNSOA_LEARN_LOG")
            .ok()
            .filter(|p| !p.is_empty())
            .and_then(|p| TraceSink::create(Path::new(&p)));

        Self {
            policy: Policy::default(),
            frame_idx: 0,
            cooldown: HashMap::new(),
            pending: HashMap::new(),
            bandit: BanditBook::new(),
            learn: LearnState::default(),
            persist_path: PathBuf::from("dynsoa_learn.json"),
            epsilon: DEFAULT_EPSILON,
            rng: StdRng::from_entropy(),
            verbose,
            trace,
            actions_applied: 0,
        }
    }

    /// Installs a new policy.
    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    /// The currently installed policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Overrides the persistence path (unless `DYNSOA_LEARN_PATH` is set,
    /// which wins at load time).
    pub fn set_persist_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return;
        }
        self.persist_path = path;
    }

    /// Overrides the exploration probability; tests pin this to 0.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// The learned gain-model coefficients.
    pub fn learn_state(&self) -> LearnState {
        self.learn
    }

    /// Bandit statistics, for inspection.
    pub fn bandit(&self) -> &BanditBook {
        &self.bandit
    }

    /// Total actions the applier has committed.
    pub fn actions_applied(&self) -> u64 {
        self.actions_applied
    }

    /// The current frame counter.
    pub fn frame_index(&self) -> u64 {
        self.frame_idx
    }

    /// Loads persisted weights, honoring a `DYNSOA_LEARN_PATH` override.
    pub fn load_state(&mut self) {
        if let Ok(p) = std::env::var("DYNSOA_LEARN_PATH") {
            if !p.is_empty() {
                self.persist_path = PathBuf::from(p);
            }
        }
        if persist::load_learn_state(&self.persist_path, &mut self.learn) {
            log::info!(
                "scheduler: restored weights a_div={:.5} a_mem={:.5} a_tail={:.5}",
                self.learn.a_div,
                self.learn.a_mem,
                self.learn.a_tail
            );
        }
    }

    /// Persists the learned weights.
    pub fn save_state(&self) {
        persist::save_learn_state(&self.persist_path, &self.learn);
    }

    /// Advances the frame counter.
    pub fn on_begin_frame(&mut self) {
        self.frame_idx += 1;
    }

    /// Selects a plan for `view` from the fixed action catalog by UCB1.
    ///
    /// This is the selection entry point for planner-driven callers; the
    /// end-of-frame applier itself derives its candidates from the policy
    /// triggers and only falls back to the bandit to arbitrate between
    /// them.
    pub fn pick_action(
        &mut self,
        store: &EntityStore,
        metrics: &MetricsHub,
        view: ViewId,
    ) -> RetilePlan {
        let catalog = planner::catalog_actions(store, metrics, &self.learn, view);
        let chosen = self
            .bandit
            .select(view, &catalog, self.epsilon, &mut self.rng);
        catalog[chosen]
    }

    /// Runs the end-of-frame pipeline: gather candidates from the policy,
    /// admit them under the frame budget, apply retiles, then run the
    /// deferred learning updates that have come due.
    pub fn on_end_frame(&mut self, store: &mut EntityStore, metrics: &MetricsHub) {
        let candidates = self.gather_candidates(store, metrics);
        self.apply_candidates(candidates, store, metrics);
        self.run_learning(metrics);
    }

    /// Evaluates triggers per view, builds scored plans, and resolves
    /// multiple surviving candidates on one view through the bandit.
    fn gather_candidates(&mut self, store: &EntityStore, metrics: &MetricsHub) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for view in 1..=MAX_SCHEDULED_VIEWS {
            let agg = metrics.aggregate(view, AGG_WINDOW);
            if agg.mean_us == 0.0 && agg.p95_us == 0.0 {
                continue;
            }
            if let Some(cool) = self.cooldown.get_mut(&view) {
                if *cool > 0 {
                    *cool -= 1;
                    continue;
                }
            }

            let mut per_view: Vec<Candidate> = Vec::new();
            for trigger in &self.policy.triggers {
                if !predicate::evaluate(&trigger.when, &agg) {
                    continue;
                }
                let plan = match trigger.action {
                    TriggerAction::RetileAosoa => {
                        planner::plan_aosoa(store, metrics, &self.learn, view, trigger.arg)
                    }
                    TriggerAction::RetileSoa => RetilePlan::default(),
                    TriggerAction::PackMatrix => {
                        planner::plan_matrix(store, metrics, &self.learn, view, trigger.arg)
                    }
                };
                let score = trigger.priority * (plan.est_gain_us / plan.est_cost_us.max(1.0));
                if score > SCORE_FLOOR {
                    per_view.push(Candidate { view, plan, score });
                }
            }

            match per_view.len() {
                0 => {}
                1 => candidates.push(per_view.pop().expect("len checked")),
                _ => {
                    // Several triggers survived for this view: let the
                    // bandit arbitrate among their plans.
                    let plans: Vec<RetilePlan> = per_view.iter().map(|c| c.plan).collect();
                    let chosen = self.bandit.select(view, &plans, self.epsilon, &mut self.rng);
                    candidates.push(per_view.swap_remove(chosen));
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.view.cmp(&b.view))
        });
        candidates
    }

    /// Applies the budget-admitted candidates and records their baselines.
    fn apply_candidates(
        &mut self,
        candidates: Vec<Candidate>,
        store: &mut EntityStore,
        metrics: &MetricsHub,
    ) {
        for idx in admit_within_budget(&candidates, FRAME_BUDGET_US) {
            let c = &candidates[idx];

            let before = metrics.aggregate(c.view, AGG_WINDOW);
            let baseline = if before.p95_us > 0.0 {
                before.p95_us
            } else if before.mean_us > 0.0 {
                before.mean_us
            } else {
                0.0
            };

            if c.plan.to == LayoutKind::SoA {
                planner::retile_to_soa(store, c.view);
            } else {
                planner::retile(store, c.view, &c.plan);
            }

            self.cooldown.insert(c.view, self.policy.cooloff_frames);
            if baseline > 0.0 {
                self.pending.insert(
                    c.view,
                    PendingAction {
                        baseline,
                        frame: self.frame_idx,
                        key: c.plan.action_key(),
                        est_cost_us: c.plan.est_cost_us,
                    },
                );
            }
            self.actions_applied += 1;

            let row = format!(
                "{},{},apply,{},{},{},{:.3},{:.3},{:.3},{:.3},NA,NA,{:.5},{:.5},{:.5},NA,NA,NA",
                self.frame_idx,
                c.view,
                action_name(c.plan.to),
                c.plan.to.code(),
                c.plan.tile_or_block,
                c.plan.est_cost_us,
                c.plan.est_gain_us,
                c.score,
                baseline,
                self.learn.a_div,
                self.learn.a_mem,
                self.learn.a_tail,
            );
            self.trace_decision("applied action", &row);
        }
    }

    /// Runs learning updates for actions applied at least
    /// [`LEARN_DELAY_FRAMES`] frames ago.
    fn run_learning(&mut self, metrics: &MetricsHub) {
        let due: Vec<ViewId> = self
            .pending
            .iter()
            .filter(|(_, p)| self.frame_idx.saturating_sub(p.frame) >= LEARN_DELAY_FRAMES)
            .map(|(view, _)| *view)
            .collect();

        for view in due {
            let Some(pending) = self.pending.get(&view) else {
                continue;
            };
            let base = pending.baseline;

            let after = metrics.aggregate(view, AGG_WINDOW);
            let obs = if after.p95_us > 0.0 {
                after.p95_us
            } else if after.mean_us > 0.0 {
                after.mean_us
            } else {
                base
            };
            if obs <= 0.0 || base <= 0.0 {
                continue;
            }

            let realized = (base - obs).max(0.0);
            let (div_term, mem_term, tail_term) = planner::aosoa_gain_terms(&after);
            let denom = 1e-6 + div_term * div_term + mem_term * mem_term + tail_term * tail_term;

            let pred = base
                * (self.learn.a_div * div_term
                    + self.learn.a_mem * mem_term
                    + self.learn.a_tail * tail_term);
            let err = realized - pred;

            let prev = self.learn;
            let step = LEARN_RATE * (err / base);
            self.learn.a_div = (prev.a_div + step * (div_term / denom)).clamp(0.0, WEIGHT_CEIL);
            self.learn.a_mem = (prev.a_mem + step * (mem_term / denom)).clamp(0.0, WEIGHT_CEIL);
            self.learn.a_tail = (prev.a_tail + step * (tail_term / denom)).clamp(0.0, WEIGHT_CEIL);

            self.bandit
                .update(view, pending.key, realized - pending.est_cost_us);

            let row = format!(
                "{},{},learn,NA,NA,NA,NA,NA,NA,{:.3},{:.3},{:.3},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5}",
                self.frame_idx,
                view,
                base,
                obs,
                realized,
                prev.a_div,
                prev.a_mem,
                prev.a_tail,
                self.learn.a_div,
                self.learn.a_mem,
                self.learn.a_tail,
            );
            self.trace_decision("learned", &row);

            self.pending.remove(&view);
        }
    }

    fn trace_decision(&mut self, what: &str, row: &str) {
        log::debug!("scheduler: {what}: {row}");
        if let Some(trace) = self.trace.as_mut() {
            trace.write_line(row);
        }
        if self.verbose {
            eprintln!("scheduler: {what}: {row}");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
