//! The per-voxel value stored in every chunk slot.
//!
//! A [`VoxelRecord`] is copied by value. Type index 0 is the empty voxel, so a
//! zeroed record is empty space.

use serde::{Deserialize, Serialize};

use crate::registry::VoxelTypeId;

/// Maximum propagated light level (4 bits).
pub const MAX_LIGHT: u8 = 15;

/// Tint applied on top of a definition's base appearance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Untinted.
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    /// Creates a tint from its three channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb8 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Render-state bits of a voxel.
///
/// The layout is identical for every voxel kind:
///
/// | bits | meaning |
/// |------|---------|
/// | 0–1 | texture rotation (quarter turns) |
/// | 2 | hidden |
/// | 3 | reserved |
/// | 4–7 | water level (water definitions only) |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelFlags(pub u8);

impl VoxelFlags {
    const ROTATION_MASK: u8 = 0b0000_0011;
    const HIDDEN_BIT: u8 = 0b0000_0100;
    const WATER_SHIFT: u8 = 4;
    const WATER_MASK: u8 = 0b1111_0000;

    /// Returns the raw byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Texture rotation in quarter turns (0–3).
    pub fn rotation(self) -> u8 {
        self.0 & Self::ROTATION_MASK
    }

    /// Sets the texture rotation; values wrap modulo 4.
    pub fn set_rotation(&mut self, quarter_turns: u8) {
        self.0 = (self.0 & !Self::ROTATION_MASK) | (quarter_turns & Self::ROTATION_MASK);
    }

    /// Whether the voxel is hidden from rendering.
    pub fn is_hidden(self) -> bool {
        self.0 & Self::HIDDEN_BIT != 0
    }

    /// Sets or clears the hidden bit.
    pub fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            self.0 |= Self::HIDDEN_BIT;
        } else {
            self.0 &= !Self::HIDDEN_BIT;
        }
    }

    /// Water fill level (0–15).
    pub fn water_level(self) -> u8 {
        (self.0 & Self::WATER_MASK) >> Self::WATER_SHIFT
    }

    /// Sets the water fill level, clamped to 15.
    pub fn set_water_level(&mut self, level: u8) {
        let level = level.min(15);
        self.0 = (self.0 & !Self::WATER_MASK) | (level << Self::WATER_SHIFT);
    }
}

/// One voxel: definition index, tint, 4-bit light and render flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelRecord {
    /// Definition index; `VoxelTypeId(0)` is empty.
    pub type_id: VoxelTypeId,
    /// Tint.
    pub color: Rgb8,
    /// Render-state bits.
    pub flags: VoxelFlags,
    light: u8,
}

impl VoxelRecord {
    /// The empty voxel.
    pub const EMPTY: VoxelRecord = VoxelRecord {
        type_id: VoxelTypeId(0),
        color: Rgb8::WHITE,
        flags: VoxelFlags(0),
        light: 0,
    };

    /// Creates an unlit voxel of the given type and tint.
    pub fn new(type_id: VoxelTypeId, color: Rgb8) -> Self {
        Self {
            type_id,
            color,
            flags: VoxelFlags::default(),
            light: 0,
        }
    }

    /// Builder-style flag override.
    pub fn with_flags(mut self, flags: VoxelFlags) -> Self {
        self.flags = flags;
        self
    }

    /// `false` exactly when the type index is 0.
    pub fn has_content(&self) -> bool {
        self.type_id.0 != 0
    }

    /// Propagated light level (0–15).
    pub fn light(&self) -> u8 {
        self.light
    }

    /// Stores a light level, clamped to [`MAX_LIGHT`].
    pub fn set_light(&mut self, level: u8) {
        self.light = level.min(MAX_LIGHT);
    }

    /// Whether two voxels are indistinguishable once light is ignored.
    pub fn same_content(&self, other: &VoxelRecord) -> bool {
        self.type_id == other.type_id && self.color == other.color && self.flags == other.flags
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
