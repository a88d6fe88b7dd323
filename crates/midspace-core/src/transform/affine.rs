//! Homogeneous 4×4 affine transform algebra.
//!
//! Matrices act on column vectors, so `a.compose(&b)` applies `b` first and
//! `a` second. The bottom row is always `[0, 0, 0, 1]`.

use std::ops::Mul;

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SpatialError};
use crate::spatial::{Matrix3, Matrix4, Point3, Vector3};

/// Determinant magnitude below which the linear part is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// Maximum Denman–Beavers iterations before the square root is declared divergent.
const SQRTM_MAX_ITERATIONS: usize = 64;

/// Relative step size at which the square-root iteration has converged.
const SQRTM_TOLERANCE: f64 = 1e-13;

/// Affine transform stored as a homogeneous 4×4 matrix.
///
/// # Examples
/// ```rust
/// use midspace_core::{AffineTransform, Matrix3, Vector3};
///
/// let shift = AffineTransform::from_parts(Matrix3::identity(), Vector3::new(1.0, 2.0, 3.0));
/// let back = shift.inverse().unwrap();
/// assert!(shift.compose(&back).is_identity());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform(Matrix4);

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Build from a linear part and a translation.
    pub fn from_parts(linear: Matrix3, translation: Vector3) -> Self {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self(m)
    }

    /// Wrap a full 4×4 matrix.
    ///
    /// Fails if the matrix has non-finite entries or a bottom row other than
    /// `[0, 0, 0, 1]`.
    pub fn from_matrix(matrix: Matrix4) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(SpatialError::invalid_geometry(
                "affine matrix contains non-finite values",
            ));
        }
        let bottom = [0.0, 0.0, 0.0, 1.0];
        let bottom_ok = (0..4).all(|c| (matrix[(3, c)] - bottom[c]).abs() < 1e-9);
        if !bottom_ok {
            return Err(SpatialError::invalid_geometry(
                "affine matrix bottom row must be [0, 0, 0, 1]",
            ));
        }
        let mut matrix = matrix;
        for (c, value) in bottom.iter().enumerate() {
            matrix[(3, c)] = *value;
        }
        Ok(Self(matrix))
    }

    /// The homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4 {
        &self.0
    }

    /// The 3×3 linear part.
    pub fn linear(&self) -> Matrix3 {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The translation column.
    pub fn translation(&self) -> Vector3 {
        self.0.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    /// `self @ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        Self(self.0 * other.0)
    }

    /// Inverse transform.
    ///
    /// Computed from the linear part so that signed permutations invert exactly.
    pub fn inverse(&self) -> Result<AffineTransform> {
        let linear = self.linear();
        let det = linear.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return Err(SpatialError::singular(format!(
                "linear part has determinant {det:e}"
            )));
        }
        let inv = linear
            .try_inverse()
            .ok_or_else(|| SpatialError::singular("linear part is not invertible"))?;
        let translation = -(inv * self.translation());
        Ok(Self::from_parts(inv, translation))
    }

    /// Principal matrix square root `B` with `B @ B ≈ self`.
    ///
    /// The result is only checked for finiteness: any non-finite entry is
    /// reported as [`SpatialError::NonSymmetrizable`].
    pub fn sqrtm(&self) -> Result<AffineTransform> {
        let root = denman_beavers_sqrt(&self.0);
        if root.iter().any(|v| !v.is_finite()) {
            return Err(SpatialError::NonSymmetrizable);
        }
        let mut root = root;
        root[(3, 0)] = 0.0;
        root[(3, 1)] = 0.0;
        root[(3, 2)] = 0.0;
        root[(3, 3)] = 1.0;
        Ok(Self(root))
    }

    /// True if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Exact identity check (no tolerance).
    pub fn is_identity(&self) -> bool {
        self.0 == Matrix4::identity()
    }

    /// Largest absolute entry-wise difference to another transform.
    pub fn max_abs_diff(&self, other: &AffineTransform) -> f64 {
        (self.0 - other.0).amax()
    }

    /// Entry-wise comparison within `tol`.
    pub fn approx_eq(&self, other: &AffineTransform, tol: f64) -> bool {
        self.max_abs_diff(other) <= tol
    }

    /// Apply to a single point.
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.linear() * point.coords + self.translation())
    }

    /// Apply to a batch of points of shape `[N, 3]`.
    ///
    /// Row-vector form: `y = x @ Aᵀ + t`.
    pub fn transform_points<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let linear = self.linear();

        let mut a_t = Vec::with_capacity(9);
        for r in 0..3 {
            for c in 0..3 {
                a_t.push(linear[(c, r)] as f32);
            }
        }
        let a_t = Tensor::<B, 2>::from_data(TensorData::new(a_t, Shape::new([3, 3])), &device);

        let t: Vec<f32> = self.translation().iter().map(|v| *v as f32).collect();
        let t = Tensor::<B, 1>::from_data(TensorData::new(t, Shape::new([3])), &device)
            .reshape([1, 3]);

        points.matmul(a_t) + t
    }
}

impl Mul for AffineTransform {
    type Output = AffineTransform;

    fn mul(self, rhs: AffineTransform) -> AffineTransform {
        self.compose(&rhs)
    }
}

/// Compose a chain given in application order reversed, like a matrix product:
/// `compose_all(&[a, b, c]) == a @ b @ c`.
pub fn compose_all(chain: &[AffineTransform]) -> AffineTransform {
    chain
        .iter()
        .fold(AffineTransform::identity(), |acc, t| acc.compose(t))
}

/// Coupled Denman–Beavers iteration for the principal square root.
///
/// Returns a NaN-filled matrix when an iterate is singular or the iteration
/// fails to settle, so callers detect failure through finiteness alone.
fn denman_beavers_sqrt(a: &Matrix4) -> Matrix4 {
    let mut y = *a;
    let mut z = Matrix4::identity();

    for _ in 0..SQRTM_MAX_ITERATIONS {
        let (Some(y_inv), Some(z_inv)) = (y.try_inverse(), z.try_inverse()) else {
            debug!("singular iterate in matrix square root");
            return Matrix4::from_element(f64::NAN);
        };
        let y_next = (y + z_inv) * 0.5;
        let z_next = (z + y_inv) * 0.5;

        let step = (y_next - y).amax();
        y = y_next;
        z = z_next;

        if !step.is_finite() {
            return Matrix4::from_element(f64::NAN);
        }
        if step <= SQRTM_TOLERANCE * y.amax().max(1.0) {
            return y;
        }
    }
    debug!(
        iterations = SQRTM_MAX_ITERATIONS,
        "matrix square root did not converge"
    );
    Matrix4::from_element(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn rotation_z(angle: f64) -> Matrix3 {
        *nalgebra::Rotation3::from_axis_angle(&Vector3::z_axis(), angle).matrix()
    }

    #[test]
    fn test_compose_applies_right_first() {
        let scale = AffineTransform::from_parts(Matrix3::identity() * 2.0, Vector3::zeros());
        let shift = AffineTransform::from_parts(Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0));

        // shift after scale: (1, 0, 0) -> (2, 0, 0) -> (3, 0, 0)
        let p = shift.compose(&scale).transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 3.0).abs() < 1e-12);

        // scale after shift: (1, 0, 0) -> (2, 0, 0) -> (4, 0, 0)
        let p = (scale * shift).transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = AffineTransform::from_parts(
            rotation_z(0.7) * Matrix3::new(1.2, 0.1, 0.0, 0.0, 0.9, 0.2, 0.0, 0.0, 1.1),
            Vector3::new(-4.0, 10.5, 3.25),
        );
        let inv = t.inverse().unwrap();
        assert!(t.compose(&inv).approx_eq(&AffineTransform::identity(), 1e-12));
        assert!(inv.compose(&t).approx_eq(&AffineTransform::identity(), 1e-12));
    }

    #[test]
    fn test_inverse_singular() {
        let flat = AffineTransform::from_parts(
            Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            Vector3::zeros(),
        );
        assert!(matches!(flat.inverse(), Err(SpatialError::SingularTransform(_))));
    }

    #[test]
    fn test_from_matrix_rejects_projective_row() {
        let mut m = Matrix4::identity();
        m[(3, 0)] = 0.5;
        assert!(AffineTransform::from_matrix(m).is_err());
        m[(3, 0)] = f64::NAN;
        assert!(AffineTransform::from_matrix(m).is_err());
    }

    #[test]
    fn test_sqrtm_identity_is_exact() {
        let root = AffineTransform::identity().sqrtm().unwrap();
        assert!(root.is_identity());
    }

    #[test]
    fn test_sqrtm_rigid() {
        let t = AffineTransform::from_parts(rotation_z(1.1), Vector3::new(8.0, -3.0, 12.0));
        let root = t.sqrtm().unwrap();
        assert!(root.compose(&root).approx_eq(&t, 1e-9));

        // Half of a rotation is the rotation by half the angle.
        assert!((root.linear() - rotation_z(0.55)).amax() < 1e-9);
    }

    #[test]
    fn test_sqrtm_half_turn_is_not_symmetrizable() {
        let t = AffineTransform::from_parts(
            Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0)),
            Vector3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(t.sqrtm(), Err(SpatialError::NonSymmetrizable));
    }

    #[test]
    fn test_sqrtm_negative_eigenvalue() {
        let t = AffineTransform::from_parts(
            Matrix3::from_diagonal(&Vector3::new(-1.0, 2.0, 3.0)),
            Vector3::zeros(),
        );
        assert_eq!(t.sqrtm(), Err(SpatialError::NonSymmetrizable));
    }

    #[test]
    fn test_compose_all_order() {
        let a = AffineTransform::from_parts(rotation_z(0.3), Vector3::new(1.0, 2.0, 3.0));
        let b = AffineTransform::from_parts(Matrix3::identity() * 1.5, Vector3::new(0.0, -1.0, 0.0));
        let c = AffineTransform::from_parts(Matrix3::identity(), Vector3::new(5.0, 0.0, 0.0));
        let chained = compose_all(&[a, b, c]);
        assert!(chained.approx_eq(&a.compose(&b.compose(&c)), 1e-12));
    }

    #[test]
    fn test_transform_points_tensor() {
        let device = Default::default();
        let t = AffineTransform::from_parts(rotation_z(std::f64::consts::FRAC_PI_2), Vector3::new(1.0, 2.0, 3.0));

        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &device);
        let out = t.transform_points(points).into_data();
        let out = out.as_slice::<f32>().unwrap();

        // (1, 0, 0) -> (0, 1, 0) -> (1, 3, 3)
        assert!((out[0] - 1.0).abs() < 1e-5);
        assert!((out[1] - 3.0).abs() < 1e-5);
        assert!((out[2] - 3.0).abs() < 1e-5);
        // (0, 0, 1) -> (0, 0, 1) -> (1, 2, 4)
        assert!((out[3] - 1.0).abs() < 1e-5);
        assert!((out[4] - 2.0).abs() < 1e-5);
        assert!((out[5] - 4.0).abs() < 1e-5);
    }
}
