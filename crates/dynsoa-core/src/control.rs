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

//! Scheduling policies and the learned gain-model coefficients.

use serde::{Deserialize, Serialize};

/// The retile action a policy trigger requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerAction {
    /// Retile the view to AoSoA with the trigger's tile argument.
    #[serde(rename = "RETILE_AOSOA")]
    RetileAosoa,
    /// Retile the view back to SoA.
    #[serde(rename = "RETILE_SOA")]
    RetileSoa,
    /// Plan a transient matrix block of the trigger's block argument.
    #[serde(rename = "PACK_MATRIX")]
    PackMatrix,
}

impl TriggerAction {
    /// The action's wire/trace name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerAction::RetileAosoa => "RETILE_AOSOA",
            TriggerAction::RetileSoa => "RETILE_SOA",
            TriggerAction::PackMatrix => "PACK_MATRIX",
        }
    }
}

/// A declarative scheduling trigger.
///
/// `when` is a predicate over [`FrameAgg`](crate::FrameAgg) field names,
/// e.g. `"branch_div > 0.2 && mem_coalesce < 0.7"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTrigger {
    /// Predicate source text.
    pub when: String,
    /// Action to take when the predicate holds.
    pub action: TriggerAction,
    /// Tile or block argument for the action.
    pub arg: i32,
    /// Relative weight applied to the candidate score.
    pub priority: f64,
}

/// A set of triggers plus scheduler pacing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Triggers evaluated against each view's aggregate every frame.
    pub triggers: Vec<PolicyTrigger>,
    /// Minimum frames between retiles of the same view.
    pub min_frames_between_retiles: u32,
    /// Frames a view sits out after an applied action.
    pub cooloff_frames: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            triggers: Vec::new(),
            min_frames_between_retiles: 5,
            cooloff_frames: 10,
        }
    }
}

/// Learned coefficients of the retile gain model. Global, not per-view.
///
/// Each weight scales one term of the estimated gain (branch divergence,
/// memory coalescing deficit, tail ratio excess) and is clamped to
/// `[0, 0.25]` by the online learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnState {
    /// Weight of the branch-divergence term.
    pub a_div: f64,
    /// Weight of the memory-coalescing term.
    pub a_mem: f64,
    /// Weight of the tail-ratio term.
    pub a_tail: f64,
}

impl Default for LearnState {
    fn default() -> Self {
        Self {
            a_div: 0.06,
            a_mem: 0.04,
            a_tail: 0.02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_state_defaults() {
        let l = LearnState::default();
        assert_eq!(l.a_div, 0.06);
        assert_eq!(l.a_mem, 0.04);
        assert_eq!(l.a_tail, 0.02);
    }

    #[test]
    fn policy_defaults() {
        let p = Policy::default();
        assert!(p.triggers.is_empty());
        assert_eq!(p.cooloff_frames, 10);
        assert_eq!(p.min_frames_between_retiles, 5);
    }

    #[test]
    fn trigger_action_serde_uses_wire_names() {
        let json = serde_json::to_string(&TriggerAction::RetileAosoa).unwrap();
        assert_eq!(json, "\"RETILE_AOSOA\"");
        let back: TriggerAction = serde_json::from_str("\"PACK_MATRIX\"").unwrap();
        assert_eq!(back, TriggerAction::PackMatrix);
    }
}
