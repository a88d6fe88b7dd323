//! Composition of network-space model outputs back to native voxel spaces.
//!
//! Forward: `net_to_mov ∘ model_fw ∘ fix_to_net` on the fixed grid.
//! Backward: `net_to_fix ∘ model_bw ∘ mov_to_net` on the moving grid.

use burn::tensor::backend::Backend;
use midspace_core::image::generate_grid;
use midspace_core::{AffineTransform, DisplacementField, ImageGeometry, SpatialError};
use tracing::debug;

use crate::error::{RegistrationError, Result};
use crate::model::{ModelOutput, ModelPrediction};
use crate::network_space::{NetworkSpace, NetworkSpaces};
use crate::output::{RegisteredTransform, RegistrationOutput};
use crate::variant::ModelVariant;

/// Composes model outputs through the network spaces of one registration.
#[derive(Debug, Clone, Copy)]
pub struct TransformComposer<'a> {
    spaces: &'a NetworkSpaces,
    moving: &'a ImageGeometry,
    fixed: &'a ImageGeometry,
}

impl<'a> TransformComposer<'a> {
    pub fn new(
        spaces: &'a NetworkSpaces,
        moving: &'a ImageGeometry,
        fixed: &'a ImageGeometry,
    ) -> Self {
        Self {
            spaces,
            moving,
            fixed,
        }
    }

    /// Fixed voxel to moving voxel, sampled on the fixed grid.
    pub fn compose_forward<B: Backend>(&self, output: &ModelOutput<B>) -> Result<ModelOutput<B>> {
        compose_through(&self.spaces.moving, output, &self.spaces.fixed, self.fixed.shape())
    }

    /// Moving voxel to fixed voxel, sampled on the moving grid.
    pub fn compose_backward<B: Backend>(&self, output: &ModelOutput<B>) -> Result<ModelOutput<B>> {
        compose_through(&self.spaces.fixed, output, &self.spaces.moving, self.moving.shape())
    }

    /// Compose both outputs and tag them with source and target geometry.
    ///
    /// Matrix variants trade forward and backward before tagging, so the
    /// moving-to-fixed output holds the matrix mapping moving voxels to
    /// fixed voxels. Dense variants keep the fixed-grid field pointing into
    /// the moving image.
    pub fn compose<B: Backend>(
        &self,
        prediction: ModelPrediction<B>,
        variant: ModelVariant,
    ) -> Result<RegistrationOutput<B>> {
        let expected = variant.output_kind();
        for (name, output) in [("forward", &prediction.forward), ("backward", &prediction.backward)] {
            if output.kind() != expected {
                return Err(RegistrationError::inference(format!(
                    "{variant} model returned a {:?} {name} transform, expected {expected:?}",
                    output.kind()
                )));
            }
        }

        let mut fw = self.compose_forward(&prediction.forward)?;
        let mut bw = self.compose_backward(&prediction.backward)?;
        if variant.swaps_outputs() {
            debug!("swapping matrix outputs");
            std::mem::swap(&mut fw, &mut bw);
        }

        Ok(RegistrationOutput {
            variant,
            forward: RegisteredTransform::new(fw, self.moving.clone(), self.fixed.clone()),
            backward: RegisteredTransform::new(bw, self.fixed.clone(), self.moving.clone()),
        })
    }
}

/// `outer.net_to_vox ∘ model ∘ inner.vox_to_net`, sampled on a grid of `shape`
/// in the native space of `inner`.
fn compose_through<B: Backend>(
    outer: &NetworkSpace,
    output: &ModelOutput<B>,
    inner: &NetworkSpace,
    shape: [usize; 3],
) -> Result<ModelOutput<B>> {
    match output {
        ModelOutput::Matrix(matrix) => Ok(ModelOutput::Matrix(
            outer
                .net_to_vox()
                .compose(matrix)
                .compose(inner.vox_to_net()),
        )),
        ModelOutput::Dense(field) => {
            let grid = inner.geometry().shape();
            if field.shape() != grid {
                return Err(SpatialError::shape_mismatch(&grid, &field.shape()).into());
            }
            compose_field(outer.net_to_vox(), field, inner.vox_to_net(), shape).map(ModelOutput::Dense)
        }
    }
}

/// Displacement of `x ↦ outer(y + d(y))` with `y = inner(x)`, on a grid of `shape`.
///
/// The field is interpolated with border clamping. Identity outer matrices
/// on a matching grid return the field unchanged.
fn compose_field<B: Backend>(
    outer: &AffineTransform,
    field: &DisplacementField<B>,
    inner: &AffineTransform,
    shape: [usize; 3],
) -> Result<DisplacementField<B>> {
    if outer.is_identity() && inner.is_identity() && field.shape() == shape {
        return Ok(field.clone());
    }
    let device = field.displacement().device();
    let y = inner.transform_points(generate_grid::<B>(shape, &device));
    let z = y.clone() + field.sample(y);
    Ok(DisplacementField::from_points(outer.transform_points(z), shape)?)
}
