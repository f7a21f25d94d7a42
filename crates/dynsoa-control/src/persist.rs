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

//! Persistence of learned gain-model coefficients.
//!
//! The on-disk format is a small JSON object with the keys `a_div`, `a_mem`
//! and `a_tail`. Loading tolerates missing keys (the corresponding weight
//! keeps its current value) and unreadable files (no-op).

use dynsoa_core::LearnState;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct PersistedWeights {
    a_div: Option<f64>,
    a_mem: Option<f64>,
    a_tail: Option<f64>,
}

/// Merges persisted weights from `path` into `state`.
///
/// Returns `true` when the file was read and parsed; `false` leaves the
/// state untouched.
pub fn load_learn_state(path: &Path, state: &mut LearnState) -> bool {
    let Ok(text) = fs::read_to_string(path) else {
        return false;
    };
    let weights: PersistedWeights = match serde_json::from_str(&text) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("persist: unreadable learn state at {}: {e}", path.display());
            return false;
        }
    };
    if let Some(d) = weights.a_div {
        state.a_div = d;
    }
    if let Some(m) = weights.a_mem {
        state.a_mem = m;
    }
    if let Some(t) = weights.a_tail {
        state.a_tail = t;
    }
    true
}

/// Writes the weights to `path` as a three-key JSON object. Best-effort.
pub fn save_learn_state(path: &Path, state: &LearnState) -> bool {
    let Ok(text) = serde_json::to_string_pretty(state) else {
        return false;
    };
    match fs::write(path, text + "\n") {
        Ok(()) => true,
        Err(e) => {
            log::warn!("persist: failed to write {}: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learn.json");
        let saved = LearnState {
            a_div: 0.1234,
            a_mem: 0.0456,
            a_tail: 0.2,
        };
        assert!(save_learn_state(&path, &saved));

        let mut loaded = LearnState::default();
        assert!(load_learn_state(&path, &mut loaded));
        assert!((loaded.a_div - saved.a_div).abs() < 1e-9);
        assert!((loaded.a_mem - saved.a_mem).abs() < 1e-9);
        assert!((loaded.a_tail - saved.a_tail).abs() < 1e-9);
    }

    #[test]
    fn missing_keys_keep_current_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, "{ \"a_mem\": 0.11 }").unwrap();

        let mut state = LearnState::default();
        assert!(load_learn_state(&path, &mut state));
        assert_eq!(state.a_div, 0.06, "absent key keeps the default");
        assert_eq!(state.a_mem, 0.11);
        assert_eq!(state.a_tail, 0.02);
    }

    #[test]
    fn missing_file_is_a_noop() {
        let mut state = LearnState::default();
        assert!(!load_learn_state(Path::new("/no/such/learn.json"), &mut state));
        assert_eq!(state, LearnState::default());
    }

    #[test]
    fn garbage_file_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json at all").unwrap();

        let mut state = LearnState::default();
        assert!(!load_learn_state(&path, &mut state));
        assert_eq!(state, LearnState::default());
    }
}
