//! Canonical network grids and their mapping to native voxel spaces.
//!
//! The network grid is a cube of unit voxels in LIA orientation with no
//! shear. A [`NetworkSpace`] pairs it with `net_to_vox`, mapping network
//! voxel indices to the native voxel indices of one image, and its inverse.

use midspace_core::{AffineTransform, ImageGeometry, Orientation, Point3, Vector3};

use crate::config::Extent;
use crate::error::Result;

/// Network grid of one image plus the transforms to and from its voxels.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSpace {
    geometry: ImageGeometry,
    net_to_vox: AffineTransform,
    vox_to_net: AffineTransform,
}

impl NetworkSpace {
    /// Relate a network grid to an image grid:
    /// `net_to_vox = image.world2vox @ network.vox2world`.
    pub fn between(network: ImageGeometry, image: &ImageGeometry) -> Self {
        let net_to_vox = image.world2vox().compose(network.vox2world());
        let vox_to_net = network.world2vox().compose(image.vox2world());
        Self {
            geometry: network,
            net_to_vox,
            vox_to_net,
        }
    }

    /// The network grid.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Network voxel indices to native voxel indices.
    pub fn net_to_vox(&self) -> &AffineTransform {
        &self.net_to_vox
    }

    /// Native voxel indices to network voxel indices.
    pub fn vox_to_net(&self) -> &AffineTransform {
        &self.vox_to_net
    }

    /// Fold `transform` in on the network side:
    /// `net_to_vox := net_to_vox @ transform`, with the inverse recomputed.
    pub fn fold(&self, transform: &AffineTransform) -> Result<Self> {
        let net_to_vox = self.net_to_vox.compose(transform);
        let vox_to_net = net_to_vox.inverse()?;
        Ok(Self {
            geometry: self.geometry.clone(),
            net_to_vox,
            vox_to_net,
        })
    }
}

/// Network spaces of the moving and fixed images of one registration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSpaces {
    pub moving: NetworkSpace,
    pub fixed: NetworkSpace,
}

/// Builds network spaces of a fixed extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSpaceBuilder {
    extent: Extent,
}

impl NetworkSpaceBuilder {
    /// Orientation of every network grid.
    pub const ORIENTATION: Orientation = Orientation::LIA;

    pub fn new(extent: Extent) -> Self {
        Self { extent }
    }

    /// Network grid of `image`, centered on the image itself.
    pub fn build(&self, image: &ImageGeometry) -> Result<NetworkSpace> {
        self.build_at(image, *image.center())
    }

    /// Network grid of `image`, centered on `reference` instead.
    pub fn build_centered_on(
        &self,
        image: &ImageGeometry,
        reference: &ImageGeometry,
    ) -> Result<NetworkSpace> {
        self.build_at(image, *reference.center())
    }

    fn build_at(&self, image: &ImageGeometry, center: Point3) -> Result<NetworkSpace> {
        let network = ImageGeometry::with_orientation(
            self.extent.shape(),
            Vector3::new(1.0, 1.0, 1.0),
            Self::ORIENTATION,
            center,
        )?;
        Ok(NetworkSpace::between(network, image))
    }
}
