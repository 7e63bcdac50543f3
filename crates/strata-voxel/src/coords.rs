//! Integer conversions between world voxel positions, chunk coordinates and
//! flat voxel indices.
//!
//! Flat indices are Y-major, then Z, then X: `idx = y·E² + z·E + x`. The
//! run-length codec relies on this ordering. All conversions use Euclidean
//! division so that negative world coordinates floor correctly.

use glam::{IVec3, Vec3};

/// Edge length of a chunk in voxels.
pub const CHUNK_EDGE: usize = 16;

/// [`CHUNK_EDGE`] as a signed integer for world-space arithmetic.
pub const CHUNK_EDGE_I32: i32 = CHUNK_EDGE as i32;

/// Number of voxels in a chunk (16³).
pub const CHUNK_VOLUME: usize = CHUNK_EDGE * CHUNK_EDGE * CHUNK_EDGE;

/// Flat index of chunk-local coordinates. Each coordinate must be in `0..16`.
pub fn flat_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < CHUNK_EDGE && y < CHUNK_EDGE && z < CHUNK_EDGE);
    y * CHUNK_EDGE * CHUNK_EDGE + z * CHUNK_EDGE + x
}

/// Inverse of [`flat_index`]: returns `(x, y, z)`.
pub fn local_coords(index: usize) -> (usize, usize, usize) {
    debug_assert!(index < CHUNK_VOLUME);
    let x = index % CHUNK_EDGE;
    let z = (index / CHUNK_EDGE) % CHUNK_EDGE;
    let y = index / (CHUNK_EDGE * CHUNK_EDGE);
    (x, y, z)
}

/// Chunk coordinate containing a world voxel position (`⌊p / E⌋` per axis).
pub fn chunk_coord(world: IVec3) -> IVec3 {
    IVec3::new(
        world.x.div_euclid(CHUNK_EDGE_I32),
        world.y.div_euclid(CHUNK_EDGE_I32),
        world.z.div_euclid(CHUNK_EDGE_I32),
    )
}

/// Splits a world voxel position into its chunk coordinate and flat index.
pub fn resolve(world: IVec3) -> (IVec3, usize) {
    let x = world.x.rem_euclid(CHUNK_EDGE_I32) as usize;
    let y = world.y.rem_euclid(CHUNK_EDGE_I32) as usize;
    let z = world.z.rem_euclid(CHUNK_EDGE_I32) as usize;
    (chunk_coord(world), flat_index(x, y, z))
}

/// World-space voxel origin of a chunk. Always a multiple of the edge length.
pub fn chunk_origin(coord: IVec3) -> IVec3 {
    coord * CHUNK_EDGE_I32
}

/// Chunk coordinate of a chunk origin. Inverse of [`chunk_origin`].
pub fn origin_to_coord(origin: IVec3) -> IVec3 {
    chunk_coord(origin)
}

/// World voxel position of a flat index inside a chunk. Inverse of [`resolve`].
pub fn world_position(coord: IVec3, index: usize) -> IVec3 {
    let (x, y, z) = local_coords(index);
    chunk_origin(coord) + IVec3::new(x as i32, y as i32, z as i32)
}

/// The voxel containing a continuous point. The only float → int step.
pub fn voxel_containing(point: Vec3) -> IVec3 {
    point.floor().as_ivec3()
}

/// The six axis-aligned faces of a chunk or voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// +X
    PosX = 0,
    /// −X
    NegX = 1,
    /// +Y
    PosY = 2,
    /// −Y
    NegY = 3,
    /// +Z
    PosZ = 4,
    /// −Z
    NegZ = 5,
}

impl Face {
    /// All faces in discriminant order.
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    /// Returns the opposite face.
    pub fn opposite(self) -> Face {
        match self {
            Face::PosX => Face::NegX,
            Face::NegX => Face::PosX,
            Face::PosY => Face::NegY,
            Face::NegY => Face::PosY,
            Face::PosZ => Face::NegZ,
            Face::NegZ => Face::PosZ,
        }
    }

    /// Unit offset towards this face.
    pub fn offset(self) -> IVec3 {
        match self {
            Face::PosX => IVec3::X,
            Face::NegX => IVec3::NEG_X,
            Face::PosY => IVec3::Y,
            Face::NegY => IVec3::NEG_Y,
            Face::PosZ => IVec3::Z,
            Face::NegZ => IVec3::NEG_Z,
        }
    }

    /// Slot in a six-element neighbor array.
    pub fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index_roundtrip_all_coords() {
        for y in 0..CHUNK_EDGE {
            for z in 0..CHUNK_EDGE {
                for x in 0..CHUNK_EDGE {
                    assert_eq!(local_coords(flat_index(x, y, z)), (x, y, z));
                }
            }
        }
    }

    #[test]
    fn test_flat_index_is_y_major() {
        assert_eq!(flat_index(1, 0, 0), 1);
        assert_eq!(flat_index(0, 0, 1), CHUNK_EDGE);
        assert_eq!(flat_index(0, 1, 0), CHUNK_EDGE * CHUNK_EDGE);
        assert_eq!(flat_index(15, 15, 15), CHUNK_VOLUME - 1);
    }

    #[test]
    fn test_chunk_coord_floors_negative() {
        assert_eq!(chunk_coord(IVec3::new(0, 0, 0)), IVec3::ZERO);
        assert_eq!(chunk_coord(IVec3::new(15, 15, 15)), IVec3::ZERO);
        assert_eq!(chunk_coord(IVec3::new(16, -1, -16)), IVec3::new(1, -1, -1));
        assert_eq!(chunk_coord(IVec3::new(-17, 0, 0)), IVec3::new(-2, 0, 0));
    }

    #[test]
    fn test_resolve_and_world_position_are_inverse() {
        for p in [
            IVec3::new(0, 0, 0),
            IVec3::new(-1, -1, -1),
            IVec3::new(37, -50, 8),
            IVec3::new(-16, 16, -33),
        ] {
            let (coord, index) = resolve(p);
            assert_eq!(world_position(coord, index), p);
        }
    }

    #[test]
    fn test_chunk_origin_is_multiple_of_edge() {
        let origin = chunk_origin(IVec3::new(-3, 2, 7));
        assert_eq!(origin, IVec3::new(-48, 32, 112));
        assert_eq!(origin_to_coord(origin), IVec3::new(-3, 2, 7));
    }

    #[test]
    fn test_voxel_containing_floors() {
        assert_eq!(voxel_containing(Vec3::new(0.5, -0.5, -1.0)), IVec3::new(0, -1, -1));
    }

    #[test]
    fn test_face_opposites() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_eq!(face.offset() + face.opposite().offset(), IVec3::ZERO);
        }
    }
}
