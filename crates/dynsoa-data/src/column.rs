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

//! A single column of a view: one field across all entities.

use dynsoa_core::ScalarType;

/// A contiguous buffer holding one field for every row of a view.
///
/// All materialized columns are 4-byte elements stored in an `f32` buffer;
/// `U32` columns reinterpret the same bits. The tag records how callers are
/// expected to read the data.
#[derive(Debug, Clone)]
pub struct Column {
    data: Vec<f32>,
    ty: ScalarType,
}

impl Column {
    /// Allocates a zero-initialized column of `len` elements.
    pub fn new(ty: ScalarType, len: usize) -> Self {
        Self {
            data: vec![0.0; len],
            ty,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` when the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of one element in bytes. Always 4 for materialized columns.
    pub fn elem_size(&self) -> usize {
        4
    }

    /// Total buffer size in bytes.
    pub fn len_bytes(&self) -> usize {
        self.data.len() * self.elem_size()
    }

    /// The declared scalar type of this column.
    pub fn scalar_type(&self) -> ScalarType {
        self.ty
    }

    /// Read access as `f32`.
    pub fn as_f32(&self) -> &[f32] {
        &self.data
    }

    /// Write access as `f32`.
    pub fn as_f32_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Read access as `u32` (bit reinterpretation).
    pub fn as_u32(&self) -> &[u32] {
        bytemuck::cast_slice(&self.data)
    }

    /// Write access as `u32` (bit reinterpretation).
    pub fn as_u32_mut(&mut self) -> &mut [u32] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Raw byte view of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Swaps in a rebuilt buffer. The replacement must have the same length.
    pub(crate) fn replace_data(&mut self, data: Vec<f32>) {
        debug_assert_eq!(data.len(), self.data.len());
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_is_zero_initialized() {
        let c = Column::new(ScalarType::F32, 8);
        assert_eq!(c.len(), 8);
        assert_eq!(c.len_bytes(), 32);
        assert!(c.as_f32().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn u32_view_shares_bits_with_f32() {
        let mut c = Column::new(ScalarType::U32, 2);
        c.as_u32_mut()[0] = 0x3f80_0000; // bit pattern of 1.0f32
        assert_eq!(c.as_f32()[0], 1.0);
        assert_eq!(c.as_bytes().len(), 8);
    }
}
