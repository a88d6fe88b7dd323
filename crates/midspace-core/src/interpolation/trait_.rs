//! Interpolator trait for sampling volumes at continuous voxel indices.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator trait for sampling values at continuous coordinates.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source volume `[d0, d1, d2]`
    /// * `indices` - Points `[N, 3]`; column `c` indexes dimension `c` of `data`
    ///
    /// # Returns
    /// Tensor of sampled values `[N]`
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
