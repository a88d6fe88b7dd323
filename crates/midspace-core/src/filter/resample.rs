//! Resampling volumes between voxel grids.
//!
//! Transforms handed to a [`Resampler`] are expressed in zero-based voxel
//! indices: for every voxel `x` of the output grid they give the position
//! to sample in the source buffer. Grid centers are never shifted
//! implicitly.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use tracing::trace;

use crate::error::{Result, SpatialError};
use crate::image::generate_grid;
use crate::interpolation::{Interpolator, LinearInterpolator};
use crate::transform::{AffineTransform, DisplacementField};

/// Output-to-source mapping used to drive a resampler.
#[derive(Debug, Clone, Copy)]
pub enum SamplingTransform<'a, B: Backend> {
    /// Matrix from output voxel indices to source voxel indices.
    Matrix(&'a AffineTransform),
    /// Dense field on the output grid pointing into the source.
    Field(&'a DisplacementField<B>),
}

/// Contract for sampling a volume into another grid.
///
/// Out-of-bounds samples take the resampler's fill value.
pub trait Resampler<B: Backend> {
    /// Sample `source` onto a grid of `shape`.
    fn resample(
        &self,
        source: &Tensor<B, 3>,
        shape: [usize; 3],
        transform: SamplingTransform<'_, B>,
    ) -> Result<Tensor<B, 3>>;
}

/// Trilinear resampler with a constant fill value (zero by default).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearResampler {
    interpolator: LinearInterpolator,
}

impl LinearResampler {
    /// Resampler filling out-of-bounds samples with zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resampler with a custom fill value.
    pub fn with_fill(value: f64) -> Self {
        Self {
            interpolator: LinearInterpolator::with_fill(value),
        }
    }
}

impl Default for LinearResampler {
    fn default() -> Self {
        Self::with_fill(0.0)
    }
}

impl<B: Backend> Resampler<B> for LinearResampler {
    fn resample(
        &self,
        source: &Tensor<B, 3>,
        shape: [usize; 3],
        transform: SamplingTransform<'_, B>,
    ) -> Result<Tensor<B, 3>> {
        trace!(from = ?source.dims(), to = ?shape, "resampling volume");
        let points = match transform {
            SamplingTransform::Matrix(matrix) => {
                let grid = generate_grid::<B>(shape, &source.device());
                matrix.transform_points(grid)
            }
            SamplingTransform::Field(field) => {
                if field.shape() != shape {
                    return Err(SpatialError::shape_mismatch(&shape, &field.shape()));
                }
                field.to_points()
            }
        };
        Ok(self.interpolator.interpolate(source, points).reshape(shape))
    }
}

/// Map intensities to `[0, 1]` using the buffer's own minimum and maximum.
///
/// A constant buffer maps to zeros.
pub fn normalize_min_max<B: Backend>(volume: Tensor<B, 3>) -> Tensor<B, 3> {
    let min = volume.clone().min().into_scalar().elem::<f64>();
    let max = volume.clone().max().into_scalar().elem::<f64>();
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return volume.zeros_like();
    }
    volume.sub_scalar(min).div_scalar(range)
}

/// Wrap a volume as a model input `[1, 1, d0, d1, d2]`.
pub fn into_batch<B: Backend>(volume: Tensor<B, 3>) -> Tensor<B, 5> {
    let [d0, d1, d2] = volume.dims();
    volume.reshape([1, 1, d0, d1, d2])
}

/// Resample filter with optional post-steps.
///
/// # Type Parameters
/// * `R` - The resampler doing the actual interpolation
pub struct ResampleImageFilter<'r, R> {
    resampler: &'r R,
    shape: [usize; 3],
    normalize: bool,
}

impl<'r, R> ResampleImageFilter<'r, R> {
    /// Create a filter writing onto a grid of `shape`.
    pub fn new(resampler: &'r R, shape: [usize; 3]) -> Self {
        Self {
            resampler,
            shape,
            normalize: false,
        }
    }

    /// Enable min–max normalization of the resampled buffer.
    pub fn with_normalization(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Output grid shape.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Resample `source` and apply the configured post-steps.
    pub fn apply<B: Backend>(
        &self,
        source: &Tensor<B, 3>,
        transform: SamplingTransform<'_, B>,
    ) -> Result<Tensor<B, 3>>
    where
        R: Resampler<B>,
    {
        let out = self.resampler.resample(source, self.shape, transform)?;
        let dims = out.dims();
        if dims != self.shape {
            return Err(SpatialError::shape_mismatch(&self.shape, &dims));
        }
        Ok(if self.normalize {
            normalize_min_max(out)
        } else {
            out
        })
    }

    /// Resample and wrap with a leading batch and channel dimension.
    pub fn apply_batched<B: Backend>(
        &self,
        source: &Tensor<B, 3>,
        transform: SamplingTransform<'_, B>,
    ) -> Result<Tensor<B, 5>>
    where
        R: Resampler<B>,
    {
        self.apply(source, transform).map(into_batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Matrix3, Vector3};
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn cube_with_dot(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        let mut data = vec![0.0f32; 6 * 6 * 6];
        data[2 * 36 + 2 * 6 + 2] = 1.0;
        Tensor::from_data(TensorData::new(data, Shape::new([6, 6, 6])), device)
    }

    #[test]
    fn test_matrix_shift() {
        let device = Default::default();
        let source = cube_with_dot(&device);

        // Output voxel x samples source voxel x - 1, so the dot moves to (3, 3, 3).
        let shift = AffineTransform::from_parts(Matrix3::identity(), Vector3::new(-1.0, -1.0, -1.0));
        let out = LinearResampler::new()
            .resample(&source, [6, 6, 6], SamplingTransform::Matrix(&shift))
            .unwrap()
            .into_data();
        let out = out.as_slice::<f32>().unwrap();

        assert!(out[3 * 36 + 3 * 6 + 3] > 0.99);
        assert!(out[2 * 36 + 2 * 6 + 2] < 0.01);
        // Voxel (0, *, *) samples index -1: out of bounds, filled with zero.
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_field_matches_matrix() {
        let device = Default::default();
        let source = cube_with_dot(&device);

        let shift = AffineTransform::from_parts(Matrix3::identity(), Vector3::new(0.5, 0.0, -1.0));
        let grid = generate_grid::<TestBackend>([6, 6, 6], &device);
        let field = DisplacementField::from_points(shift.transform_points(grid), [6, 6, 6]).unwrap();

        let resampler = LinearResampler::new();
        let a = resampler.resample(&source, [6, 6, 6], SamplingTransform::Matrix(&shift)).unwrap();
        let b = resampler.resample(&source, [6, 6, 6], SamplingTransform::Field(&field)).unwrap();
        let diff = (a - b).abs().max().into_scalar();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_field_shape_must_match_output() {
        let device = Default::default();
        let source = cube_with_dot(&device);
        let field = DisplacementField::<TestBackend>::zeros([4, 4, 4], &device);
        let result = LinearResampler::new().resample(&source, [6, 6, 6], SamplingTransform::Field(&field));
        assert!(matches!(result, Err(SpatialError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_normalization_uses_resampled_range() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![10.0f32, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0], Shape::new([2, 2, 2])),
            &device,
        );
        let resampler = LinearResampler::new();
        let filter = ResampleImageFilter::new(&resampler, [2, 2, 2]).with_normalization();
        let out = filter
            .apply(&source, SamplingTransform::Matrix(&AffineTransform::identity()))
            .unwrap()
            .into_data();
        let out = out.as_slice::<f32>().unwrap();
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[7] - 1.0).abs() < 1e-6);
        assert!((out[3] - 3.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_volume_normalizes_to_zero() {
        let device = Default::default();
        let volume = Tensor::<TestBackend, 3>::ones([3, 3, 3], &device).mul_scalar(4.0);
        let out = normalize_min_max(volume);
        assert_eq!(out.abs().max().into_scalar(), 0.0);
    }

    #[test]
    fn test_batched_shape() {
        let device = Default::default();
        let source = cube_with_dot(&device);
        let resampler = LinearResampler::new();
        let filter = ResampleImageFilter::new(&resampler, [4, 5, 6]);
        let out = filter
            .apply_batched(&source, SamplingTransform::Matrix(&AffineTransform::identity()))
            .unwrap();
        assert_eq!(out.dims(), [1, 1, 4, 5, 6]);
    }
}
