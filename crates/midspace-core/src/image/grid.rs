use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the voxel index grid of a 3D shape.
///
/// Returns a tensor of shape `[N, 3]` with rows `(i, j, k)` in row-major
/// order, so row `n` addresses element `n` of the flattened volume and
/// column `c` indexes tensor dimension `c`.
///
/// # Arguments
/// * `shape` - The grid shape `[d0, d1, d2]`
/// * `device` - The device to create the tensor on
pub fn generate_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let [d0, d1, d2] = shape;
    let total = d0 * d1 * d2;

    let mut grid = Vec::with_capacity(total * 3);
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                grid.push(i as f32);
                grid.push(j as f32);
                grid.push(k as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}
