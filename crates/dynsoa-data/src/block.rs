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

//! Transient column-major matrix blocks.

/// A transient, column-major packed copy of selected columns over a row
/// range.
///
/// Element `(r, j)` lives at `data[j * rows + r]`; `rows` is the leading
/// dimension. The block is owned by the caller between
/// [`acquire_matrix_block`](crate::EntityStore::acquire_matrix_block) and
/// [`release_matrix_block`](crate::EntityStore::release_matrix_block), which
/// optionally writes the cells back to the source columns recorded at
/// acquisition.
#[derive(Debug, Clone)]
pub struct MatrixBlock {
    /// Column-major cell storage, `rows * cols` elements.
    pub data: Vec<f32>,
    /// Row count; also the leading dimension.
    pub rows: usize,
    /// Column count (number of packed source columns).
    pub cols: usize,
    /// First source row covered by the block.
    pub offset: usize,
    /// Total buffer size in bytes.
    pub bytes: usize,
    /// Dotted paths of the source columns, in block column order.
    pub(crate) paths: Vec<String>,
}

impl MatrixBlock {
    /// The leading dimension of the column-major data (equals `rows`).
    pub fn leading_dim(&self) -> usize {
        self.rows
    }

    /// Read access to block column `j` as a contiguous slice.
    pub fn col(&self, j: usize) -> &[f32] {
        &self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Write access to block column `j` as a contiguous slice.
    pub fn col_mut(&mut self, j: usize) -> &mut [f32] {
        &mut self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// The source column paths recorded at acquisition.
    pub fn source_paths(&self) -> &[String] {
        &self.paths
    }
}
