//! Save file summaries printed by `inspect`.

use std::fmt;

use strata_persist::WorldSnapshot;

/// Counts describing one decoded save.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveSummary {
    /// Format version the file was written in.
    pub version: u8,
    /// Chunk edge length the file was written for.
    pub chunk_edge: u8,
    /// Entries in the voxel name table.
    pub voxel_names: usize,
    /// Entries in the item name table.
    pub item_names: usize,
    /// Chunk records.
    pub chunks: usize,
    /// Run-length words across all chunks.
    pub runs: usize,
    /// Non-empty voxels covered by runs.
    pub voxels: usize,
    /// Attached light sources.
    pub light_sources: usize,
    /// Spawned item stacks.
    pub items: usize,
    /// Tagged scene objects.
    pub scene_objects: usize,
    /// Saved player position.
    pub player_position: [f32; 3],
}

impl SaveSummary {
    /// Summarizes a decoded snapshot.
    pub fn of(snapshot: &WorldSnapshot) -> Self {
        Self {
            version: snapshot.version,
            chunk_edge: snapshot.chunk_edge,
            voxel_names: snapshot.voxel_names.len(),
            item_names: snapshot.item_names.len(),
            chunks: snapshot.chunks.len(),
            runs: snapshot.run_count(),
            voxels: snapshot.voxel_count(),
            light_sources: snapshot.chunks.iter().map(|c| c.light_sources.len()).sum(),
            items: snapshot.chunks.iter().map(|c| c.items.len()).sum(),
            scene_objects: snapshot.scene_objects.len(),
            player_position: snapshot.player.position.to_array(),
        }
    }
}

impl fmt::Display for SaveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format version: {}", self.version)?;
        writeln!(f, "chunk edge:     {}", self.chunk_edge)?;
        writeln!(
            f,
            "name tables:    {} voxels, {} items",
            self.voxel_names, self.item_names
        )?;
        writeln!(
            f,
            "chunks:         {} ({} runs, {} voxels)",
            self.chunks, self.runs, self.voxels
        )?;
        writeln!(
            f,
            "attachments:    {} light sources, {} items",
            self.light_sources, self.items
        )?;
        writeln!(f, "scene objects:  {}", self.scene_objects)?;
        let [x, y, z] = self.player_position;
        write!(f, "player:         ({x:.2}, {y:.2}, {z:.2})")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
