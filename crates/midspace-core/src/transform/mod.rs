//! Transform types and operations.
//!
//! Matrix transforms are host-side 4×4 homogeneous matrices; dense transforms
//! are per-voxel displacement tensors.

pub mod affine;
pub mod displacement_field;
pub mod space;

pub use affine::{compose_all, AffineTransform};
pub use displacement_field::DisplacementField;
pub use space::{field_to_ras, matrix_to_voxel, matrix_to_world, FieldConvention, TransformSpace};
