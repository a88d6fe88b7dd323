//! Final transforms tagged with the geometries they relate.
//!
//! A [`RegisteredTransform`] always stores voxel-space data:
//! - a matrix maps source voxel indices to target voxel indices;
//! - a field lives on the target grid and holds voxel shifts into the source.
//!
//! World-space matrices and RAS fields are derived on request.

use burn::tensor::backend::Backend;
use midspace_core::filter::{Resampler, SamplingTransform};
use midspace_core::transform::{field_to_ras, matrix_to_world, FieldConvention, TransformSpace};
use midspace_core::{AffineTransform, DisplacementField, ImageGeometry, Volume};

use crate::error::{RegistrationError, Result};
use crate::initial::GEOMETRY_TOLERANCE;
use crate::model::ModelOutput;
use crate::variant::{ModelVariant, OutputKind};

/// A composed transform between two native image spaces.
#[derive(Debug, Clone)]
pub struct RegisteredTransform<B: Backend> {
    data: ModelOutput<B>,
    source: ImageGeometry,
    target: ImageGeometry,
}

impl<B: Backend> RegisteredTransform<B> {
    pub fn new(data: ModelOutput<B>, source: ImageGeometry, target: ImageGeometry) -> Self {
        Self {
            data,
            source,
            target,
        }
    }

    /// Voxel-space data.
    pub fn data(&self) -> &ModelOutput<B> {
        &self.data
    }

    pub fn kind(&self) -> OutputKind {
        self.data.kind()
    }

    /// Geometry of the image being transformed.
    pub fn source(&self) -> &ImageGeometry {
        &self.source
    }

    /// Geometry of the image it is aligned to.
    pub fn target(&self) -> &ImageGeometry {
        &self.target
    }

    /// Voxel-space matrix, if this is a matrix transform.
    pub fn matrix(&self) -> Option<&AffineTransform> {
        self.data.as_matrix()
    }

    /// Voxel-CRS field, if this is a dense transform.
    pub fn field(&self) -> Option<&DisplacementField<B>> {
        self.data.as_field()
    }

    /// The matrix expressed in `space`.
    pub fn matrix_in(&self, space: TransformSpace) -> Result<AffineTransform> {
        let matrix = self.matrix().ok_or_else(|| {
            RegistrationError::invalid_configuration("dense transform has no matrix form")
        })?;
        Ok(match space {
            TransformSpace::Voxel => *matrix,
            TransformSpace::World => matrix_to_world(matrix, &self.source, &self.target),
        })
    }

    /// The field expressed in `convention`.
    pub fn field_in(&self, convention: FieldConvention) -> Result<DisplacementField<B>> {
        let field = self.field().ok_or_else(|| {
            RegistrationError::invalid_configuration("matrix transform has no field form")
        })?;
        Ok(match convention {
            FieldConvention::VoxelCrs => field.clone(),
            FieldConvention::Ras => field_to_ras(field, &self.source, &self.target),
        })
    }

    /// Resample a source image onto the target grid.
    pub fn resample<R: Resampler<B>>(
        &self,
        volume: &Volume<B>,
        resampler: &R,
    ) -> Result<Volume<B>> {
        volume.validate()?;
        if !volume.geometry().is_equal(&self.source, GEOMETRY_TOLERANCE) {
            return Err(RegistrationError::geometry_mismatch(
                "volume does not live on the transform's source grid",
            ));
        }

        let shape = self.target.shape();
        let frame = volume.frame();
        let moved = match &self.data {
            ModelOutput::Matrix(matrix) => {
                let target_to_source = matrix.inverse()?;
                resampler.resample(&frame, shape, SamplingTransform::Matrix(&target_to_source))?
            }
            ModelOutput::Dense(field) => {
                resampler.resample(&frame, shape, SamplingTransform::Field(field))?
            }
        };
        Ok(Volume::from_frame(moved, self.target.clone()))
    }

    /// Align the source image by rewriting its geometry instead of resampling:
    /// `vox2world := target.vox2world @ matrix`.
    pub fn aligned_source_geometry(&self) -> Result<ImageGeometry> {
        let matrix = self.matrix().ok_or_else(|| {
            RegistrationError::invalid_configuration(
                "header-only alignment needs a matrix transform",
            )
        })?;
        let vox2world = self.target.vox2world().compose(matrix);
        Ok(ImageGeometry::from_vox2world(self.source.shape(), &vox2world)?)
    }
}

/// Moving-to-fixed and fixed-to-moving transforms of one registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutput<B: Backend> {
    /// Variant that produced the transforms.
    pub variant: ModelVariant,
    /// Source is the moving image, target the fixed image.
    pub forward: RegisteredTransform<B>,
    /// Source is the fixed image, target the moving image.
    pub backward: RegisteredTransform<B>,
}
