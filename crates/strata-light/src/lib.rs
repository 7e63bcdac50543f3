//! Light queries over stored per-voxel light levels.

pub mod query;

pub use query::LightQuery;
