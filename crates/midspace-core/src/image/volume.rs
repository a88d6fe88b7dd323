//! Volume buffers paired with their geometry.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::ImageGeometry;
use crate::error::{Result, SpatialError};

/// Image buffer of shape `[d0, d1, d2, frames]` and the grid it lives on.
///
/// Volumes are read-only once constructed; registration only ever samples
/// from them.
#[derive(Debug, Clone)]
pub struct Volume<B: Backend> {
    data: Tensor<B, 4>,
    geometry: ImageGeometry,
}

impl<B: Backend> Volume<B> {
    /// Create a volume from a multi-frame buffer.
    pub fn new(data: Tensor<B, 4>, geometry: ImageGeometry) -> Self {
        Self { data, geometry }
    }

    /// Create a single-frame volume from a 3D buffer.
    pub fn from_frame(data: Tensor<B, 3>, geometry: ImageGeometry) -> Self {
        let [d0, d1, d2] = data.dims();
        Self::new(data.reshape([d0, d1, d2, 1]), geometry)
    }

    /// Raw buffer `[d0, d1, d2, frames]`.
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Geometry of the voxel grid.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.data.dims()[3]
    }

    /// Check that this is a single-frame 3D volume matching its geometry.
    pub fn validate(&self) -> Result<()> {
        let [d0, d1, d2, frames] = self.data.dims();
        if frames != 1 {
            return Err(SpatialError::invalid_geometry(format!(
                "expected a single-frame volume, got {frames} frames"
            )));
        }
        if [d0, d1, d2] != self.geometry.shape() {
            return Err(SpatialError::invalid_geometry(format!(
                "buffer shape {:?} does not match geometry shape {:?}",
                [d0, d1, d2],
                self.geometry.shape()
            )));
        }
        Ok(())
    }

    /// The first frame as a 3D tensor.
    pub fn frame(&self) -> Tensor<B, 3> {
        let [d0, d1, d2, _] = self.data.dims();
        self.data.clone().narrow(3, 0, 1).reshape([d0, d1, d2])
    }
}
