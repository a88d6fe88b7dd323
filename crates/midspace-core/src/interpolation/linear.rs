//! Trilinear interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::trait_::Interpolator;

/// How samples outside the grid are treated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    /// Any point outside `[0, d - 1]` on some axis takes this value.
    Fill(f64),
    /// Corner indices are clamped to the grid, replicating border values.
    Clamp,
}

/// Trilinear interpolator over `[d0, d1, d2]` volumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearInterpolator {
    boundary: Boundary,
}

impl LinearInterpolator {
    /// Interpolator that fills out-of-grid samples with `value`.
    pub fn with_fill(value: f64) -> Self {
        Self {
            boundary: Boundary::Fill(value),
        }
    }

    /// Interpolator that replicates border values.
    pub fn clamped() -> Self {
        Self {
            boundary: Boundary::Clamp,
        }
    }

    #[inline]
    fn gather<B: Backend>(
        flat_data: &Tensor<B, 1>,
        i: &Tensor<B, 1, Int>,
        j: &Tensor<B, 1, Int>,
        k: &Tensor<B, 1, Int>,
        stride_i: i32,
        stride_j: i32,
    ) -> Tensor<B, 1> {
        let idx = i.clone() * stride_i + j.clone() * stride_j + k.clone();
        flat_data.clone().gather(0, idx)
    }

    /// 1.0 where `coord` lies within `[0, extent - 1]`, 0.0 elsewhere.
    fn inside<B: Backend>(coord: &Tensor<B, 1>, extent: usize) -> Tensor<B, 1> {
        let lower = coord.clone().greater_equal_elem(0.0).float();
        let upper = coord.clone().lower_equal_elem((extent - 1) as f64).float();
        lower * upper
    }
}

impl Default for LinearInterpolator {
    fn default() -> Self {
        Self::with_fill(0.0)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();
        let n = indices.dims()[0];
        let device = indices.device();

        // indices: [N, 3] -> (i, j, k) addressing dims (0, 1, 2)
        let i = indices.clone().narrow(1, 0, 1).reshape([n]);
        let j = indices.clone().narrow(1, 1, 1).reshape([n]);
        let k = indices.narrow(1, 2, 1).reshape([n]);

        let mask = match self.boundary {
            Boundary::Fill(_) => Some(
                Self::inside(&i, d0) * Self::inside(&j, d1) * Self::inside(&k, d2),
            ),
            Boundary::Clamp => None,
        };

        let i0 = i.clone().floor();
        let j0 = j.clone().floor();
        let k0 = k.clone().floor();

        let wi = i - i0.clone();
        let wj = j - j0.clone();
        let wk = k - k0.clone();

        let i1 = i0.clone().add_scalar(1.0);
        let j1 = j0.clone().add_scalar(1.0);
        let k1 = k0.clone().add_scalar(1.0);

        let i0_i = i0.clamp(0.0, (d0 - 1) as f64).int();
        let j0_i = j0.clamp(0.0, (d1 - 1) as f64).int();
        let k0_i = k0.clamp(0.0, (d2 - 1) as f64).int();
        let i1_i = i1.clamp(0.0, (d0 - 1) as f64).int();
        let j1_i = j1.clamp(0.0, (d1 - 1) as f64).int();
        let k1_i = k1.clamp(0.0, (d2 - 1) as f64).int();

        let stride_i = (d1 * d2) as i32;
        let stride_j = d2 as i32;
        let flat_data = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather(&flat_data, &i0_i, &j0_i, &k0_i, stride_i, stride_j);
        let v001 = Self::gather(&flat_data, &i0_i, &j0_i, &k1_i, stride_i, stride_j);
        let v010 = Self::gather(&flat_data, &i0_i, &j1_i, &k0_i, stride_i, stride_j);
        let v011 = Self::gather(&flat_data, &i0_i, &j1_i, &k1_i, stride_i, stride_j);
        let v100 = Self::gather(&flat_data, &i1_i, &j0_i, &k0_i, stride_i, stride_j);
        let v101 = Self::gather(&flat_data, &i1_i, &j0_i, &k1_i, stride_i, stride_j);
        let v110 = Self::gather(&flat_data, &i1_i, &j1_i, &k0_i, stride_i, stride_j);
        let v111 = Self::gather(&flat_data, &i1_i, &j1_i, &k1_i, stride_i, stride_j);

        let one = Tensor::<B, 1>::ones([n], &device);
        let one_minus_wi = one.clone() - wi.clone();
        let one_minus_wj = one.clone() - wj.clone();
        let one_minus_wk = one - wk.clone();

        // Along k
        let c00 = v000 * one_minus_wk.clone() + v001 * wk.clone();
        let c01 = v010 * one_minus_wk.clone() + v011 * wk.clone();
        let c10 = v100 * one_minus_wk.clone() + v101 * wk.clone();
        let c11 = v110 * one_minus_wk + v111 * wk;

        // Along j
        let c0 = c00 * one_minus_wj.clone() + c01 * wj.clone();
        let c1 = c10 * one_minus_wj + c11 * wj;

        // Along i
        let values = c0 * one_minus_wi + c1 * wi;

        match (mask, self.boundary) {
            (Some(mask), Boundary::Fill(fill)) => {
                let outside = mask.clone().neg().add_scalar(1.0);
                values * mask + outside.mul_scalar(fill)
            }
            _ => values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    /// Volume whose value at (i, j, k) is `100 i + 10 j + k`.
    fn ramp(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        let mut data = Vec::new();
        for i in 0..3 {
            for j in 0..4 {
                for k in 0..5 {
                    data.push((100 * i + 10 * j + k) as f32);
                }
            }
        }
        Tensor::from_data(TensorData::new(data, Shape::new([3, 4, 5])), device)
    }

    #[test]
    fn test_integer_points_are_exact() {
        let device = Default::default();
        let volume = ramp(&device);
        let points = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0, 0.0], [2.0, 3.0, 4.0], [1.0, 2.0, 3.0]], &device);

        let values = LinearInterpolator::default().interpolate(&volume, points).into_data();
        let values = values.as_slice::<f32>().unwrap();
        assert_eq!(values, &[0.0, 234.0, 123.0]);
    }

    #[test]
    fn test_linear_in_each_axis() {
        let device = Default::default();
        let volume = ramp(&device);
        let points = Tensor::<TestBackend, 2>::from_floats([[0.5, 1.25, 2.75]], &device);

        let values = LinearInterpolator::default().interpolate(&volume, points).into_data();
        let value = values.as_slice::<f32>().unwrap()[0];
        assert!((value - (50.0 + 12.5 + 2.75)).abs() < 1e-4);
    }

    #[test]
    fn test_fill_outside_grid() {
        let device = Default::default();
        let volume = ramp(&device) + 1.0;
        let points = Tensor::<TestBackend, 2>::from_floats([[-0.5, 0.0, 0.0], [0.0, 3.5, 0.0], [0.0, 0.0, 4.0]], &device);

        let values = LinearInterpolator::with_fill(-7.0).interpolate(&volume, points).into_data();
        let values = values.as_slice::<f32>().unwrap();
        assert_eq!(values[0], -7.0);
        assert_eq!(values[1], -7.0);
        assert_eq!(values[2], 5.0);
    }

    #[test]
    fn test_clamp_replicates_border() {
        let device = Default::default();
        let volume = ramp(&device);
        let points = Tensor::<TestBackend, 2>::from_floats([[5.0, -2.0, 9.0]], &device);

        let values = LinearInterpolator::clamped().interpolate(&volume, points).into_data();
        assert_eq!(values.as_slice::<f32>().unwrap()[0], 204.0);
    }
}
