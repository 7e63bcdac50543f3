//! The chunk store as one unit: a [`World`] owning the pool, registry,
//! generator and observer, with save/load entry points and background
//! population.

pub mod error;
pub mod populate;
pub mod world;

pub use error::WorldError;
pub use populate::{BackgroundPopulator, PopulatedChunk};
pub use world::{LoadMode, World};
