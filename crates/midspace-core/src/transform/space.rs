//! Conversions between voxel-space and world-space transforms.
//!
//! A voxel-space matrix maps source voxel indices to target voxel indices;
//! its world-space counterpart maps source world points to target world
//! points. Dense fields live on the target grid and point into the source.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::{AffineTransform, DisplacementField};
use crate::image::{generate_grid, ImageGeometry};

/// Coordinate space a matrix transform is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformSpace {
    /// Zero-based voxel indices of the source and target grids.
    Voxel,
    /// World (scanner) coordinates.
    World,
}

/// Convention a displacement field's vectors are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldConvention {
    /// Shifts in source voxel indices (column, row, slice).
    VoxelCrs,
    /// World-space (RAS) shifts between target and source positions.
    Ras,
}

/// Express a voxel-space matrix in world space:
/// `target.vox2world @ m @ source.world2vox`.
pub fn matrix_to_world(
    matrix: &AffineTransform,
    source: &ImageGeometry,
    target: &ImageGeometry,
) -> AffineTransform {
    target
        .vox2world()
        .compose(matrix)
        .compose(source.world2vox())
}

/// Express a world-space matrix in voxel space:
/// `target.world2vox @ m @ source.vox2world`.
pub fn matrix_to_voxel(
    matrix: &AffineTransform,
    source: &ImageGeometry,
    target: &ImageGeometry,
) -> AffineTransform {
    target
        .world2vox()
        .compose(matrix)
        .compose(source.vox2world())
}

/// Convert a voxel-CRS field on the `target` grid into RAS displacements:
/// `d_ras(x) = source.vox2world(x + d(x)) - target.vox2world(x)`.
///
/// The result lives on the same grid, so the original field shape is kept.
pub fn field_to_ras<B: Backend>(
    field: &DisplacementField<B>,
    source: &ImageGeometry,
    target: &ImageGeometry,
) -> DisplacementField<B> {
    let shape = field.shape();
    let [d0, d1, d2] = shape;
    let device = field.displacement().device();

    let grid = generate_grid::<B>(shape, &device);
    let sampled_world = source.vox2world().transform_points(field.to_points());
    let grid_world = target.vox2world().transform_points(grid);
    let displacement = (sampled_world - grid_world).reshape([d0, d1, d2, 3]);

    DisplacementField { displacement }
}
