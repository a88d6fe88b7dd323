//! Interpolation of volumes at continuous voxel indices.

pub mod trait_;
pub mod linear;

pub use linear::{Boundary, LinearInterpolator};
pub use trait_::Interpolator;
