//! Core geometry for network-space registration.
//!
//! Provides image geometries with their voxel/world mappings, 4×4 affine
//! algebra (compose, invert, principal square root), dense displacement
//! fields, and the resampling contract used to move volumes between grids.

pub mod error;
pub mod spatial;
pub mod image;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use error::{Result, SpatialError};
pub use image::{ImageGeometry, Volume};
pub use spatial::{AxisCode, Matrix3, Matrix4, Orientation, Point3, Vector3};
pub use transform::{AffineTransform, DisplacementField, FieldConvention, TransformSpace};
