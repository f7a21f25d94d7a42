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

//! A view: the addressable collection of columns over an archetype instance.

use crate::column::Column;
use dynsoa_core::{ArchetypeId, LayoutKind};
use std::collections::HashMap;

/// A population of entities stored as named columns.
///
/// Columns are addressed by the dotted path `"Component.field"`. Kernels
/// receive `&mut View` and read/write rows through the typed slice
/// accessors; every slice is exactly [`len`](View::len) elements long.
pub struct View {
    pub(crate) archetype: ArchetypeId,
    pub(crate) len: usize,
    pub(crate) columns: HashMap<String, Column>,
    pub(crate) layout: LayoutKind,
    pub(crate) aosoa_tile: u32,
}

impl View {
    pub(crate) fn new(archetype: ArchetypeId, len: usize) -> Self {
        Self {
            archetype,
            len,
            columns: HashMap::new(),
            layout: LayoutKind::SoA,
            aosoa_tile: 0,
        }
    }

    /// The archetype this view was anchored to.
    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    /// Number of entities (rows).
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the view holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current physical layout label.
    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    /// The AoSoA tile when `layout() == AoSoA`, else 0.
    pub fn aosoa_tile(&self) -> u32 {
        self.aosoa_tile
    }

    /// Looks up a column by dotted path.
    pub fn column(&self, path: &str) -> Option<&Column> {
        self.columns.get(path)
    }

    /// Mutable column lookup by dotted path.
    pub fn column_mut(&mut self, path: &str) -> Option<&mut Column> {
        self.columns.get_mut(path)
    }

    /// Typed read access to a column's rows.
    pub fn column_f32(&self, path: &str) -> Option<&[f32]> {
        self.columns.get(path).map(Column::as_f32)
    }

    /// Typed write access to a column's rows.
    pub fn column_f32_mut(&mut self, path: &str) -> Option<&mut [f32]> {
        self.columns.get_mut(path).map(Column::as_f32_mut)
    }

    /// Typed read access to a `U32` column's rows.
    pub fn column_u32(&self, path: &str) -> Option<&[u32]> {
        self.columns.get(path).map(Column::as_u32)
    }

    /// Typed write access to a `U32` column's rows.
    pub fn column_u32_mut(&mut self, path: &str) -> Option<&mut [u32]> {
        self.columns.get_mut(path).map(Column::as_u32_mut)
    }

    /// Simultaneous mutable access to two distinct columns.
    ///
    /// Kernels that integrate one column from another (e.g. position from
    /// velocity) need both slices at once; the borrow is split here so they
    /// do not have to copy.
    pub fn column_pair_mut(
        &mut self,
        a: &str,
        b: &str,
    ) -> Option<(&mut Column, &mut Column)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (path, col) in self.columns.iter_mut() {
            if path == a {
                first = Some(col);
            } else if path == b {
                second = Some(col);
            }
        }
        Some((first?, second?))
    }

    /// Iterates the view's column paths.
    pub fn column_paths(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynsoa_core::ScalarType;

    fn sample_view() -> View {
        let mut v = View::new(1, 4);
        v.columns
            .insert("Position.x".to_string(), Column::new(ScalarType::F32, 4));
        v.columns
            .insert("Velocity.vx".to_string(), Column::new(ScalarType::F32, 4));
        v
    }

    #[test]
    fn column_lookup_by_path() {
        let v = sample_view();
        assert!(v.column("Position.x").is_some());
        assert!(v.column("Position.w").is_none());
        assert_eq!(v.column_f32("Velocity.vx").unwrap().len(), 4);
    }

    #[test]
    fn pair_access_splits_the_borrow() {
        let mut v = sample_view();
        {
            let (px, vx) = v.column_pair_mut("Position.x", "Velocity.vx").unwrap();
            vx.as_f32_mut()[0] = 2.0;
            px.as_f32_mut()[0] = vx.as_f32()[0] * 0.5;
        }
        assert_eq!(v.column_f32("Position.x").unwrap()[0], 1.0);
    }

    #[test]
    fn pair_access_rejects_same_or_missing_paths() {
        let mut v = sample_view();
        assert!(v.column_pair_mut("Position.x", "Position.x").is_none());
        assert!(v.column_pair_mut("Position.x", "nope").is_none());
    }
}
