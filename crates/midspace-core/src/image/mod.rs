//! Image geometry and volume buffers.
//!
//! `ImageGeometry` describes where a voxel grid sits in world space;
//! `Volume` pairs a tensor buffer with the geometry it was acquired on.

pub mod geometry;
pub mod volume;
pub mod grid;

pub use geometry::ImageGeometry;
pub use volume::Volume;
pub use grid::generate_grid;
