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

//! Schema descriptors: scalar types, fields, components, and archetypes.

use serde::{Deserialize, Serialize};

/// Identifier of a defined archetype. 1-based; 0 is never a valid id.
pub type ArchetypeId = u64;

/// Identifier of a storage view. 1-based and dense; 0 is never a valid id.
pub type ViewId = u64;

/// The scalar element type of a column.
///
/// All materialized columns are 4-byte scalars (`F32`, or `U32` for flag
/// masks); the 8-byte variants are declarable in schemas but the store never
/// allocates columns for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// 32-bit IEEE float.
    F32,
    /// 32-bit signed integer.
    I32,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit IEEE float.
    F64,
    /// 64-bit signed integer.
    I64,
}

impl ScalarType {
    /// Size of one element in bytes.
    pub fn elem_size(&self) -> usize {
        match self {
            ScalarType::F32 | ScalarType::I32 | ScalarType::U32 => 4,
            ScalarType::F64 | ScalarType::I64 => 8,
        }
    }
}

/// A single named field of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, e.g. `"x"`.
    pub name: String,
    /// Scalar type of the field.
    pub ty: ScalarType,
}

impl Field {
    /// Creates a new field descriptor.
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A named component: an ordered list of fields.
///
/// Components are metadata only. Column storage is addressed by the dotted
/// path `"Component.field"`, and the store materializes columns
/// independently of what was declared here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Component name, e.g. `"Position"`.
    pub name: String,
    /// Ordered field list.
    pub fields: Vec<Field>,
}

impl ComponentDef {
    /// Creates a new component descriptor.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// A named archetype: an ordered list of component names.
///
/// Referenced components are not validated to exist; an archetype may name
/// components that were never defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeDesc {
    /// Archetype name, e.g. `"Boid"`.
    pub name: String,
    /// Names of the components this archetype is composed of.
    pub components: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_elem_sizes() {
        assert_eq!(ScalarType::F32.elem_size(), 4);
        assert_eq!(ScalarType::I32.elem_size(), 4);
        assert_eq!(ScalarType::U32.elem_size(), 4);
        assert_eq!(ScalarType::F64.elem_size(), 8);
        assert_eq!(ScalarType::I64.elem_size(), 8);
    }

    #[test]
    fn component_construction() {
        let c = ComponentDef::new(
            "Position",
            vec![
                Field::new("x", ScalarType::F32),
                Field::new("y", ScalarType::F32),
                Field::new("z", ScalarType::F32),
            ],
        );
        assert_eq!(c.name, "Position");
        assert_eq!(c.fields.len(), 3);
        assert_eq!(c.fields[0].name, "x");
    }
}
