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

//! Process-wide component and archetype definitions.

use dynsoa_core::{ArchetypeDesc, ArchetypeId, ComponentDef};
use std::collections::HashMap;

/// Registry of component and archetype descriptors.
///
/// Entries live for the registry's lifetime; there is no deletion. Archetype
/// ids are 1-based and assigned in definition order. Components referenced
/// by an archetype are not required to exist.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    components: HashMap<String, ComponentDef>,
    archetypes: Vec<ArchetypeDesc>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a component definition by name.
    pub fn define_component(&mut self, component: ComponentDef) {
        self.components.insert(component.name.clone(), component);
    }

    /// Appends an archetype descriptor and returns its 1-based id.
    pub fn define_archetype(&mut self, name: impl Into<String>, components: &[&str]) -> ArchetypeId {
        self.archetypes.push(ArchetypeDesc {
            name: name.into(),
            components: components.iter().map(|s| s.to_string()).collect(),
        });
        self.archetypes.len() as ArchetypeId
    }

    /// Looks up a component definition by name.
    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.get(name)
    }

    /// Looks up an archetype descriptor by id.
    pub fn archetype(&self, id: ArchetypeId) -> Option<&ArchetypeDesc> {
        if id == 0 {
            return None;
        }
        self.archetypes.get(id as usize - 1)
    }

    /// Number of defined archetypes.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }
}
