//! Dense displacement field transform.
//!
//! A field of shape `[d0, d1, d2, 3]` stores, for every voxel `x` of the grid
//! it was produced on, a shift `d(x)` such that `x + d(x)` is the voxel index
//! to sample in the source grid. The field has no geometry of its own.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, SpatialError};
use crate::image::generate_grid;
use crate::interpolation::{Interpolator, LinearInterpolator};

/// Dense per-voxel displacement field.
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend> {
    /// Displacements with shape `[d0, d1, d2, 3]`.
    pub(crate) displacement: Tensor<B, 4>,
}

impl<B: Backend> DisplacementField<B> {
    /// Wrap a displacement tensor of shape `[d0, d1, d2, 3]`.
    pub fn new(displacement: Tensor<B, 4>) -> Result<Self> {
        let dims = displacement.dims();
        if dims[3] != 3 {
            return Err(SpatialError::shape_mismatch(
                &[dims[0], dims[1], dims[2], 3],
                &dims,
            ));
        }
        Ok(Self { displacement })
    }

    /// Zero displacement over `shape`.
    pub fn zeros(shape: [usize; 3], device: &B::Device) -> Self {
        Self {
            displacement: Tensor::zeros([shape[0], shape[1], shape[2], 3], device),
        }
    }

    /// Build from absolute sample positions `[N, 3]` on a grid of `shape`.
    pub fn from_points(points: Tensor<B, 2>, shape: [usize; 3]) -> Result<Self> {
        let n = shape.iter().product::<usize>();
        if points.dims() != [n, 3] {
            return Err(SpatialError::shape_mismatch(&[n, 3], &points.dims()));
        }
        let grid = generate_grid::<B>(shape, &points.device());
        let displacement = (points - grid).reshape([shape[0], shape[1], shape[2], 3]);
        Ok(Self { displacement })
    }

    /// The displacement tensor.
    pub fn displacement(&self) -> &Tensor<B, 4> {
        &self.displacement
    }

    /// Spatial shape of the sampling grid.
    pub fn shape(&self) -> [usize; 3] {
        let [d0, d1, d2, _] = self.displacement.dims();
        [d0, d1, d2]
    }

    /// Displacements flattened to `[N, 3]` in grid order.
    pub fn flat(&self) -> Tensor<B, 2> {
        let n = self.shape().iter().product::<usize>();
        self.displacement.clone().reshape([n, 3])
    }

    /// Absolute sample positions `x + d(x)`, shape `[N, 3]`.
    pub fn to_points(&self) -> Tensor<B, 2> {
        let grid = generate_grid::<B>(self.shape(), &self.displacement.device());
        grid + self.flat()
    }

    /// One displacement component as a volume.
    pub fn component(&self, axis: usize) -> Tensor<B, 3> {
        let [d0, d1, d2] = self.shape();
        self.displacement
            .clone()
            .narrow(3, axis, 1)
            .reshape([d0, d1, d2])
    }

    /// Interpolate the displacement at continuous grid positions `[N, 3]`.
    ///
    /// Positions outside the grid take the nearest border displacement.
    pub fn sample(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let n = points.dims()[0];
        let interpolator = LinearInterpolator::clamped();
        let components: Vec<Tensor<B, 2>> = (0..3)
            .map(|axis| {
                interpolator
                    .interpolate(&self.component(axis), points.clone())
                    .reshape([n, 1])
            })
            .collect();
        Tensor::cat(components, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rejects_wrong_channel_count() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::zeros([4, 4, 4, 2], &device);
        assert!(DisplacementField::new(tensor).is_err());
    }

    #[test]
    fn test_zero_field_points_are_grid() {
        let device = Default::default();
        let field = DisplacementField::<TestBackend>::zeros([2, 3, 4], &device);
        assert_eq!(field.shape(), [2, 3, 4]);

        let points = field.to_points().into_data();
        let grid = generate_grid::<TestBackend>([2, 3, 4], &device).into_data();
        assert_eq!(points.as_slice::<f32>().unwrap(), grid.as_slice::<f32>().unwrap());
    }

    #[test]
    fn test_points_roundtrip() {
        let device = Default::default();
        let shape = [3, 3, 3];
        let shift = Tensor::<TestBackend, 2>::ones([27, 3], &device).mul_scalar(0.5);
        let points = generate_grid::<TestBackend>(shape, &device) + shift;

        let field = DisplacementField::from_points(points, shape).unwrap();
        let disp = field.displacement().clone().into_data();
        assert!(disp.as_slice::<f32>().unwrap().iter().all(|v| (*v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_sample_constant_field() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([4, 4, 4, 3], &device).mul_scalar(2.0);
        let field = DisplacementField::new(tensor).unwrap();

        // Inside and far outside: a constant field samples to the constant.
        let points = Tensor::<TestBackend, 2>::from_floats([[1.5, 2.25, 0.5], [-10.0, 20.0, 3.0]], &device);
        let sampled = field.sample(points).into_data();
        assert!(sampled.as_slice::<f32>().unwrap().iter().all(|v| (*v - 2.0).abs() < 1e-6));
    }
}
