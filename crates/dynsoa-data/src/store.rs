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

//! The entity store: view ownership, matrix blocks, and layout transforms.

use crate::block::MatrixBlock;
use crate::column::Column;
use crate::view::View;
use dynsoa_core::{ArchetypeId, LayoutKind, ScalarType, ViewId};

/// Scratch row handed to a `spawn` initialization callback.
///
/// The callback's writes are *not* bound back into storage; populations are
/// expected to be initialized through direct column writes after spawning.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpawnRow {
    /// Position x.
    pub px: f32,
    /// Position y.
    pub py: f32,
    /// Position z.
    pub pz: f32,
    /// Velocity x.
    pub vx: f32,
    /// Velocity y.
    pub vy: f32,
    /// Velocity z.
    pub vz: f32,
}

/// The pre-declared F32 columns every spawned view starts with.
const SPAWN_COLUMNS: [&str; 6] = [
    "Position.x",
    "Position.y",
    "Position.z",
    "Velocity.vx",
    "Velocity.vy",
    "Velocity.vz",
];

/// Owner of all views and their column storage.
///
/// View ids are 1-based and dense. Every operation on an unknown id is a
/// checked no-op (`None` / `false`) rather than undefined behavior.
#[derive(Default)]
pub struct EntityStore {
    views: Vec<View>,
}

impl EntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views currently owned.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Looks up a view by id.
    pub fn view(&self, view: ViewId) -> Option<&View> {
        if view == 0 {
            return None;
        }
        self.views.get(view as usize - 1)
    }

    /// Mutable view lookup by id.
    pub fn view_mut(&mut self, view: ViewId) -> Option<&mut View> {
        if view == 0 {
            return None;
        }
        self.views.get_mut(view as usize - 1)
    }

    /// Creates a new view of `count` entities anchored to `archetype`.
    ///
    /// The view starts in SoA layout with six zero-initialized F32 columns:
    /// `Position.{x,y,z}` and `Velocity.{vx,vy,vz}`. When `init_fn` is
    /// given it is invoked once per row against a scratch [`SpawnRow`];
    /// its output is deliberately not copied into the columns.
    pub fn spawn(
        &mut self,
        archetype: ArchetypeId,
        count: usize,
        init_fn: Option<&mut dyn FnMut(usize, &mut SpawnRow)>,
    ) -> ViewId {
        let mut view = View::new(archetype, count);
        for path in SPAWN_COLUMNS {
            view.columns
                .insert(path.to_string(), Column::new(ScalarType::F32, count));
        }

        if let Some(f) = init_fn {
            let mut row = SpawnRow::default();
            for i in 0..count {
                f(i, &mut row);
            }
        }

        self.views.push(view);
        let id = self.views.len() as ViewId;
        log::debug!("store: spawned view {id} ({count} rows, archetype {archetype})");
        id
    }

    /// Returns the id of the most recent view with the given archetype, or
    /// allocates a new empty view when none exists.
    pub fn make_view(&mut self, archetype: ArchetypeId) -> ViewId {
        for (idx, v) in self.views.iter().enumerate().rev() {
            if v.archetype == archetype {
                return (idx + 1) as ViewId;
            }
        }
        self.views.push(View::new(archetype, 0));
        self.views.len() as ViewId
    }

    /// Number of entities in a view; 0 for unknown ids.
    pub fn view_len(&self, view: ViewId) -> usize {
        self.view(view).map_or(0, View::len)
    }

    /// Current layout label of a view.
    pub fn layout(&self, view: ViewId) -> Option<LayoutKind> {
        self.view(view).map(View::layout)
    }

    /// Declares an extra zero-initialized column on an existing view.
    ///
    /// Backs optional columns such as a `"Flags.mask"` U32 mask that the
    /// spawn set does not include. No-op when the path already exists or
    /// the view is unknown.
    pub fn add_column(&mut self, view: ViewId, path: &str, ty: ScalarType) -> bool {
        let Some(v) = self.view_mut(view) else {
            return false;
        };
        if v.columns.contains_key(path) {
            return false;
        }
        let len = v.len;
        v.columns.insert(path.to_string(), Column::new(ty, len));
        true
    }

    /// Total bytes a full layout migration of this view would move.
    pub fn bytes_to_move(&self, view: ViewId) -> usize {
        self.view(view)
            .map_or(0, |v| v.columns.values().map(Column::len_bytes).sum())
    }

    /// Packs `rows` rows starting at `offset` of the named columns into a
    /// column-major block.
    ///
    /// Rows past the view's length are truncated (left zeroed), as are the
    /// block columns of unknown paths. The caller owns the block until
    /// [`release_matrix_block`](Self::release_matrix_block).
    pub fn acquire_matrix_block(
        &self,
        view: ViewId,
        paths: &[&str],
        rows: usize,
        offset: usize,
    ) -> Option<MatrixBlock> {
        let v = self.view(view)?;
        let cols = paths.len();
        let mut block = MatrixBlock {
            data: vec![0.0; rows * cols],
            rows,
            cols,
            offset,
            bytes: rows * cols * 4,
            paths: paths.iter().map(|p| p.to_string()).collect(),
        };

        for (j, path) in paths.iter().enumerate() {
            let Some(src) = v.column_f32(path) else {
                continue;
            };
            let dst = block.col_mut(j);
            for (i, cell) in dst.iter_mut().enumerate() {
                let idx = offset + i;
                if idx >= v.len {
                    break;
                }
                *cell = src[idx];
            }
        }
        Some(block)
    }

    /// Releases a block, optionally copying its cells back to the source
    /// columns recorded at acquisition.
    pub fn release_matrix_block(&mut self, view: ViewId, block: MatrixBlock, write_back: bool) {
        if !write_back {
            return;
        }
        let Some(v) = self.view_mut(view) else {
            return;
        };
        let len = v.len;
        for (j, path) in block.paths.iter().enumerate() {
            let Some(dst) = v.column_f32_mut(path) else {
                continue;
            };
            let src = block.col(j);
            for (i, &cell) in src.iter().enumerate() {
                let idx = block.offset + i;
                if idx >= len {
                    break;
                }
                dst[idx] = cell;
            }
        }
    }

    /// Reorganizes a view's columns into tiles of up to `tile` elements and
    /// labels it AoSoA.
    ///
    /// Each column is rebuilt tile by tile into a fresh buffer of identical
    /// size; byte contents are preserved, so a subsequent
    /// [`transform_aosoa_to_soa`](Self::transform_aosoa_to_soa) round-trips
    /// exactly. The rebuild cost is what the planner's
    /// `bytes_to_move / mem_bw` estimate models.
    pub fn transform_soa_to_aosoa(&mut self, view: ViewId, tile: u32) -> bool {
        if tile == 0 {
            return false;
        }
        let Some(v) = self.view_mut(view) else {
            return false;
        };
        let t = tile as usize;

        for col in v.columns.values_mut() {
            let src = col.as_f32();
            let mut dst = vec![0.0f32; src.len()];
            let mut b = 0;
            while b < src.len() {
                let e = (b + t).min(src.len());
                dst[b..e].copy_from_slice(&src[b..e]);
                b = e;
            }
            col.replace_data(dst);
        }

        v.layout = LayoutKind::AoSoA;
        v.aosoa_tile = tile;
        log::debug!("store: view {view} -> AoSoA(tile={tile})");
        true
    }

    /// Migrates a view back to plain SoA.
    ///
    /// Performs a full column copy to model the migration cost, then resets
    /// the layout label and tile.
    pub fn transform_aosoa_to_soa(&mut self, view: ViewId) -> bool {
        let Some(v) = self.view_mut(view) else {
            return false;
        };
        if v.layout == LayoutKind::AoSoA {
            for col in v.columns.values_mut() {
                let dst = col.as_f32().to_vec();
                col.replace_data(dst);
            }
        }
        v.layout = LayoutKind::SoA;
        v.aosoa_tile = 0;
        log::debug!("store: view {view} -> SoA");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawned_store(count: usize) -> (EntityStore, ViewId) {
        let mut store = EntityStore::new();
        let v = store.spawn(1, count, None);
        (store, v)
    }

    #[test]
    fn spawn_declares_six_zeroed_f32_columns() {
        let (store, v) = spawned_store(100);
        assert_eq!(store.view_len(v), 100);
        for path in SPAWN_COLUMNS {
            let col = store.view(v).unwrap().column_f32(path).unwrap();
            assert_eq!(col.len(), 100, "column {path} should have one row per entity");
            assert!(col.iter().all(|&x| x == 0.0));
        }
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));
    }

    #[test]
    fn spawn_init_callback_runs_without_binding() {
        let mut store = EntityStore::new();
        let mut calls = 0usize;
        let v = store.spawn(
            1,
            10,
            Some(&mut |i, row: &mut SpawnRow| {
                calls += 1;
                row.px = i as f32;
            }),
        );
        assert_eq!(calls, 10);
        // The scratch row is not written back to the columns.
        let px = store.view(v).unwrap().column_f32("Position.x").unwrap();
        assert!(px.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn make_view_prefers_most_recent_matching_view() {
        let mut store = EntityStore::new();
        let first = store.spawn(7, 10, None);
        let second = store.spawn(7, 20, None);
        assert_ne!(first, second);
        assert_eq!(store.make_view(7), second);
    }

    #[test]
    fn make_view_allocates_empty_view_for_unknown_archetype() {
        let mut store = EntityStore::new();
        let v = store.make_view(3);
        assert_eq!(v, 1);
        assert_eq!(store.view_len(v), 0);
        // A second call finds the view it just created.
        assert_eq!(store.make_view(3), v);
    }

    #[test]
    fn unknown_ids_are_checked_noops() {
        let mut store = EntityStore::new();
        assert_eq!(store.view_len(0), 0);
        assert_eq!(store.view_len(42), 0);
        assert_eq!(store.bytes_to_move(42), 0);
        assert!(store.layout(42).is_none());
        assert!(!store.transform_soa_to_aosoa(42, 64));
        assert!(!store.transform_aosoa_to_soa(42));
        assert!(store.acquire_matrix_block(42, &["Position.x"], 8, 0).is_none());
    }

    #[test]
    fn bytes_to_move_sums_columns_and_survives_transforms() {
        let (mut store, v) = spawned_store(1000);
        let expected = 6 * 1000 * 4;
        assert_eq!(store.bytes_to_move(v), expected);

        store.transform_soa_to_aosoa(v, 64);
        assert_eq!(store.bytes_to_move(v), expected);
        store.transform_aosoa_to_soa(v);
        assert_eq!(store.bytes_to_move(v), expected);
    }

    #[test]
    fn aosoa_round_trip_is_bitwise() {
        let (mut store, v) = spawned_store(1000);
        {
            let px = store.view_mut(v).unwrap().column_f32_mut("Position.x").unwrap();
            for (i, x) in px.iter_mut().enumerate() {
                *x = i as f32;
            }
        }
        let before: Vec<u8> = store.view(v).unwrap().column("Position.x").unwrap().as_bytes().to_vec();

        assert!(store.transform_soa_to_aosoa(v, 64));
        assert_eq!(store.layout(v), Some(LayoutKind::AoSoA));
        assert_eq!(store.view(v).unwrap().aosoa_tile(), 64);

        assert!(store.transform_aosoa_to_soa(v));
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));
        assert_eq!(store.view(v).unwrap().aosoa_tile(), 0);

        let after = store.view(v).unwrap().column("Position.x").unwrap().as_bytes();
        assert_eq!(after, &before[..], "round-trip must restore exact bytes");
    }

    #[test]
    fn aosoa_with_tile_larger_than_len_round_trips() {
        let (mut store, v) = spawned_store(17);
        assert!(store.transform_soa_to_aosoa(v, 256));
        assert!(store.transform_aosoa_to_soa(v));
        assert_eq!(store.view_len(v), 17);
    }

    #[test]
    fn zero_tile_is_rejected() {
        let (mut store, v) = spawned_store(8);
        assert!(!store.transform_soa_to_aosoa(v, 0));
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));
    }

    #[test]
    fn soa_transform_on_non_aosoa_view_just_resets_labels() {
        let (mut store, v) = spawned_store(8);
        assert!(store.transform_aosoa_to_soa(v));
        assert_eq!(store.layout(v), Some(LayoutKind::SoA));
        assert_eq!(store.view(v).unwrap().aosoa_tile(), 0);
    }

    #[test]
    fn add_column_declares_flags_mask() {
        let (mut store, v) = spawned_store(16);
        assert!(store.add_column(v, "Flags.mask", ScalarType::U32));
        let flags = store.view(v).unwrap().column_u32("Flags.mask").unwrap();
        assert_eq!(flags.len(), 16);
        assert!(flags.iter().all(|&m| m == 0));
        // Re-declaration is a no-op.
        assert!(!store.add_column(v, "Flags.mask", ScalarType::U32));
        assert_eq!(store.bytes_to_move(v), 7 * 16 * 4);
    }

    #[test]
    fn matrix_block_copies_columns_in() {
        let (mut store, v) = spawned_store(100);
        {
            let view = store.view_mut(v).unwrap();
            let px = view.column_f32_mut("Position.x").unwrap();
            for (i, x) in px.iter_mut().enumerate() {
                *x = i as f32;
            }
            let vx = view.column_f32_mut("Velocity.vx").unwrap();
            for (i, x) in vx.iter_mut().enumerate() {
                *x = 1000.0 + i as f32;
            }
        }

        let block = store
            .acquire_matrix_block(v, &["Position.x", "Velocity.vx"], 10, 5)
            .unwrap();
        assert_eq!(block.rows, 10);
        assert_eq!(block.cols, 2);
        assert_eq!(block.leading_dim(), 10);
        assert_eq!(block.bytes, 10 * 2 * 4);
        for r in 0..10 {
            assert_eq!(block.data[r], (5 + r) as f32);
            assert_eq!(block.data[10 + r], 1000.0 + (5 + r) as f32);
        }
    }

    #[test]
    fn matrix_block_truncates_at_view_len_and_zero_fills_unknown_paths() {
        let (store, v) = spawned_store(8);
        let block = store
            .acquire_matrix_block(v, &["Position.x", "NoSuch.col"], 16, 4)
            .unwrap();
        // Rows 4..8 of the source exist; the remaining cells stay zero.
        assert_eq!(block.col(0).len(), 16);
        assert!(block.col(1).iter().all(|&c| c == 0.0));
    }

    #[test]
    fn release_with_write_back_targets_acquired_paths() {
        let (mut store, v) = spawned_store(64);
        let mut block = store
            .acquire_matrix_block(v, &["Velocity.vy", "Position.z"], 8, 0)
            .unwrap();
        for r in 0..8 {
            block.col_mut(0)[r] = 2.0 * r as f32;
            block.col_mut(1)[r] = -1.0 * r as f32;
        }
        store.release_matrix_block(v, block, true);

        let view = store.view(v).unwrap();
        let vy = view.column_f32("Velocity.vy").unwrap();
        let pz = view.column_f32("Position.z").unwrap();
        for r in 0..8 {
            assert_eq!(vy[r], 2.0 * r as f32);
            assert_eq!(pz[r], -1.0 * r as f32);
        }
        // Untouched rows keep their values.
        assert_eq!(vy[8], 0.0);

        // Re-acquiring with identical parameters reads back what was written.
        let again = store
            .acquire_matrix_block(v, &["Velocity.vy", "Position.z"], 8, 0)
            .unwrap();
        for r in 0..8 {
            assert_eq!(again.col(0)[r], 2.0 * r as f32);
            assert_eq!(again.col(1)[r], -1.0 * r as f32);
        }
    }

    #[test]
    fn release_without_write_back_leaves_columns_untouched() {
        let (mut store, v) = spawned_store(16);
        let mut block = store.acquire_matrix_block(v, &["Position.x"], 4, 0).unwrap();
        block.col_mut(0).fill(9.0);
        store.release_matrix_block(v, block, false);
        let px = store.view(v).unwrap().column_f32("Position.x").unwrap();
        assert!(px.iter().all(|&x| x == 0.0));
    }
}
