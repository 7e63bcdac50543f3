//! Definition registry: maps runtime indices to voxel and item definitions.
//!
//! Runtime indices are volatile (they depend on registration order in the
//! current session). Save files refer to definitions by name, so every
//! consumer in this workspace goes through the [`DefinitionRegistry`] name
//! contract. [`DefinitionTable`] is the in-memory implementation. Index 0 is
//! always the empty voxel so that zeroed chunk memory is empty space.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Runtime index of a voxel definition (2 bytes, stored in every voxel).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelTypeId(pub u16);

impl VoxelTypeId {
    /// The empty voxel.
    pub const EMPTY: VoxelTypeId = VoxelTypeId(0);
}

/// Runtime index of an item definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemTypeId(pub u16);

/// How a voxel definition is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderType {
    /// Fully opaque cube.
    Opaque,
    /// Alpha-tested cube (leaves, grass).
    Cutout,
    /// Translucent cube (glass).
    Transparent,
    /// Water volume; uses the water-level flag bits.
    Water,
    /// Arbitrary model with its own transform.
    Custom,
}

/// Full descriptor for a voxel definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoxelDefinition {
    /// Stable name used on disk (e.g. "stone", "torch").
    pub name: String,
    /// Render path.
    pub render_type: RenderType,
    /// Whether the voxel blocks light.
    pub opaque: bool,
    /// Regenerated from gameplay state; never persisted.
    pub is_dynamic: bool,
    /// Explicitly excluded from save files.
    pub do_not_save: bool,
    /// Light emission (0 = none, 15 = max).
    pub light_intensity: u8,
}

impl VoxelDefinition {
    /// An opaque, saveable, non-emissive cube.
    pub fn solid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            render_type: RenderType::Opaque,
            opaque: true,
            is_dynamic: false,
            do_not_save: false,
            light_intensity: 0,
        }
    }
}

/// Persistence-relevant classification of a definition, decided once per
/// definition rather than per voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelKind {
    /// Plain voxel; merges into runs with identical neighbours.
    Standard,
    /// Custom-render voxel; always its own run and may carry a rotation.
    Custom,
    /// Dynamic or `do_not_save`; skipped by the writer.
    Dynamic,
}

impl VoxelKind {
    /// Classifies a definition.
    pub fn of(def: &VoxelDefinition) -> Self {
        if def.is_dynamic || def.do_not_save {
            VoxelKind::Dynamic
        } else if def.render_type == RenderType::Custom {
            VoxelKind::Custom
        } else {
            VoxelKind::Standard
        }
    }
}

/// Full descriptor for an item definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Stable name used on disk.
    pub name: String,
    /// Light emitted when attached to a voxel face (0–15).
    pub light_intensity: u8,
}

/// Errors that can occur during definition registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A definition with the same name has already been registered.
    #[error("duplicate definition name: {0}")]
    DuplicateName(String),
    /// All index slots have been consumed.
    #[error("definition registry is full (max 65536 entries)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Name ↔ index lookup contract consumed by the chunk store and the codec.
pub trait DefinitionRegistry {
    /// Number of voxel definitions, including the empty voxel at index 0.
    fn voxel_count(&self) -> usize;

    /// Voxel definition for an index, if it exists.
    fn voxel(&self, id: VoxelTypeId) -> Option<&VoxelDefinition>;

    /// Resolves a voxel definition by its stable name.
    fn resolve_voxel(&self, name: &str) -> Option<VoxelTypeId>;

    /// Number of item definitions.
    fn item_count(&self) -> usize;

    /// Item definition for an index, if it exists.
    fn item(&self, id: ItemTypeId) -> Option<&ItemDefinition>;

    /// Resolves an item definition by its stable name.
    fn resolve_item(&self, name: &str) -> Option<ItemTypeId>;

    /// Stable name of a voxel definition.
    fn voxel_name(&self, id: VoxelTypeId) -> Option<&str> {
        self.voxel(id).map(|def| def.name.as_str())
    }

    /// Stable name of an item definition.
    fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.item(id).map(|def| def.name.as_str())
    }

    /// Persistence class; unknown indices are treated as unsaveable.
    fn voxel_kind(&self, id: VoxelTypeId) -> VoxelKind {
        self.voxel(id).map_or(VoxelKind::Dynamic, VoxelKind::of)
    }

    /// Whether an index resolves to a definition.
    fn is_valid_voxel(&self, id: VoxelTypeId) -> bool {
        (id.0 as usize) < self.voxel_count()
    }

    /// Whether the voxel blocks light. Empty and unknown indices do not.
    fn is_opaque(&self, id: VoxelTypeId) -> bool {
        id != VoxelTypeId::EMPTY && self.voxel(id).is_some_and(|def| def.opaque)
    }

    /// Light emitted by a voxel definition.
    fn light_intensity(&self, id: VoxelTypeId) -> u8 {
        self.voxel(id).map_or(0, |def| def.light_intensity)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Dense, append-only definition table with O(1) lookup by index and name.
pub struct DefinitionTable {
    /// Dense array where `index == VoxelTypeId.0`.
    voxels: Vec<VoxelDefinition>,
    voxel_names: FxHashMap<String, VoxelTypeId>,
    /// Dense array where `index == ItemTypeId.0`.
    items: Vec<ItemDefinition>,
    item_names: FxHashMap<String, ItemTypeId>,
}

impl DefinitionTable {
    /// Name reserved for the empty voxel at index 0.
    pub const EMPTY_NAME: &'static str = "empty";

    /// Creates a table with the empty voxel pre-registered as index 0.
    pub fn new() -> Self {
        let empty = VoxelDefinition {
            name: Self::EMPTY_NAME.to_string(),
            render_type: RenderType::Transparent,
            opaque: false,
            is_dynamic: false,
            do_not_save: true,
            light_intensity: 0,
        };

        let mut voxel_names = FxHashMap::default();
        voxel_names.insert(Self::EMPTY_NAME.to_string(), VoxelTypeId::EMPTY);

        Self {
            voxels: vec![empty],
            voxel_names,
            items: Vec::new(),
            item_names: FxHashMap::default(),
        }
    }

    /// Registers a voxel definition and returns its index.
    ///
    /// Indices are assigned sequentially starting from 1.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken, or
    /// [`RegistryError::RegistryFull`] if all 65 536 slots are consumed.
    pub fn register_voxel(&mut self, def: VoxelDefinition) -> Result<VoxelTypeId, RegistryError> {
        if self.voxel_names.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.voxels.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = VoxelTypeId(self.voxels.len() as u16);
        self.voxel_names.insert(def.name.clone(), id);
        self.voxels.push(def);
        Ok(id)
    }

    /// Registers an item definition and returns its index.
    ///
    /// # Errors
    ///
    /// Same conditions as [`register_voxel`](Self::register_voxel).
    pub fn register_item(&mut self, def: ItemDefinition) -> Result<ItemTypeId, RegistryError> {
        if self.item_names.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.items.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = ItemTypeId(self.items.len() as u16);
        self.item_names.insert(def.name.clone(), id);
        self.items.push(def);
        Ok(id)
    }
}

impl Default for DefinitionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry for DefinitionTable {
    fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    fn voxel(&self, id: VoxelTypeId) -> Option<&VoxelDefinition> {
        self.voxels.get(id.0 as usize)
    }

    fn resolve_voxel(&self, name: &str) -> Option<VoxelTypeId> {
        self.voxel_names.get(name).copied()
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item(&self, id: ItemTypeId) -> Option<&ItemDefinition> {
        self.items.get(id.0 as usize)
    }

    fn resolve_item(&self, name: &str) -> Option<ItemTypeId> {
        self.item_names.get(name).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn torch_model() -> VoxelDefinition {
        VoxelDefinition {
            name: "lantern".to_string(),
            render_type: RenderType::Custom,
            opaque: false,
            is_dynamic: false,
            do_not_save: false,
            light_intensity: 14,
        }
    }

    #[test]
    fn test_empty_is_index_zero() {
        let table = DefinitionTable::new();
        assert_eq!(table.voxel_count(), 1);
        assert_eq!(table.resolve_voxel("empty"), Some(VoxelTypeId::EMPTY));
        assert!(!table.is_opaque(VoxelTypeId::EMPTY));
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut table = DefinitionTable::new();
        let stone = table.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let dirt = table.register_voxel(VoxelDefinition::solid("dirt")).unwrap();
        assert_eq!(stone, VoxelTypeId(1));
        assert_eq!(dirt, VoxelTypeId(2));
        assert_eq!(table.voxel_name(dirt), Some("dirt"));
    }

    #[test]
    fn test_names_resolve_after_many_registrations() {
        let mut table = DefinitionTable::new();
        let ids: Vec<_> = (0..200)
            .map(|i| table.register_voxel(VoxelDefinition::solid(format!("block_{i}"))).unwrap())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(table.resolve_voxel(&format!("block_{i}")), Some(*id));
        }
        assert_eq!(table.resolve_voxel("Block_0"), None);
        assert_eq!(table.resolve_item("block_0"), None);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut table = DefinitionTable::new();
        table.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let result = table.register_voxel(VoxelDefinition::solid("stone"));
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }

    #[test]
    fn test_items_have_separate_namespace() {
        let mut table = DefinitionTable::new();
        table.register_voxel(VoxelDefinition::solid("torch")).unwrap();
        let item = table
            .register_item(ItemDefinition {
                name: "torch".to_string(),
                light_intensity: 15,
            })
            .unwrap();
        assert_eq!(item, ItemTypeId(0));
        assert_eq!(table.resolve_item("torch"), Some(item));
        assert_eq!(table.item_name(item), Some("torch"));
    }

    #[test]
    fn test_kind_classification() {
        let mut table = DefinitionTable::new();
        let stone = table.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let lantern = table.register_voxel(torch_model()).unwrap();
        let mut fire = VoxelDefinition::solid("fire");
        fire.is_dynamic = true;
        let fire = table.register_voxel(fire).unwrap();
        let mut marker = VoxelDefinition::solid("marker");
        marker.do_not_save = true;
        let marker = table.register_voxel(marker).unwrap();

        assert_eq!(table.voxel_kind(stone), VoxelKind::Standard);
        assert_eq!(table.voxel_kind(lantern), VoxelKind::Custom);
        assert_eq!(table.voxel_kind(fire), VoxelKind::Dynamic);
        assert_eq!(table.voxel_kind(marker), VoxelKind::Dynamic);
        assert_eq!(table.voxel_kind(VoxelTypeId(999)), VoxelKind::Dynamic);
    }

    #[test]
    fn test_unknown_index_is_invalid_and_transparent() {
        let table = DefinitionTable::new();
        assert!(!table.is_valid_voxel(VoxelTypeId(5)));
        assert!(!table.is_opaque(VoxelTypeId(5)));
        assert_eq!(table.light_intensity(VoxelTypeId(5)), 0);
    }
}
