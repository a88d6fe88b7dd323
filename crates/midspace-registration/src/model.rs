//! Inference collaborator interface.
//!
//! Models receive two normalized network-space volumes of shape
//! `[1, 1, n, n, n]` and return a forward transform (fixed network grid to
//! moving network grid) and its backward counterpart.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use midspace_core::{AffineTransform, DisplacementField};

use crate::config::{ComputeConfig, Extent};
use crate::error::Result;
use crate::variant::{ModelVariant, OutputKind};

/// One transform produced by a model.
#[derive(Debug, Clone)]
pub enum ModelOutput<B: Backend> {
    /// Matrix over network voxel indices.
    Matrix(AffineTransform),
    /// Displacement field in network voxel indices.
    Dense(DisplacementField<B>),
}

impl<B: Backend> ModelOutput<B> {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Matrix(_) => OutputKind::Matrix,
            Self::Dense(_) => OutputKind::Dense,
        }
    }

    pub fn as_matrix(&self) -> Option<&AffineTransform> {
        match self {
            Self::Matrix(m) => Some(m),
            Self::Dense(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&DisplacementField<B>> {
        match self {
            Self::Matrix(_) => None,
            Self::Dense(f) => Some(f),
        }
    }
}

/// Forward and backward transforms from a single inference call.
#[derive(Debug, Clone)]
pub struct ModelPrediction<B: Backend> {
    /// Samples the moving network grid from the fixed network grid.
    pub forward: ModelOutput<B>,
    /// Samples the fixed network grid from the moving network grid.
    pub backward: ModelOutput<B>,
}

/// A loaded registration model.
pub trait RegistrationModel<B: Backend> {
    /// Variant this model implements.
    fn variant(&self) -> ModelVariant;

    /// Run inference on batched `[1, 1, n, n, n]` inputs.
    ///
    /// `regularization` is set for variants that take one.
    fn predict(
        &self,
        moving: Tensor<B, 5>,
        fixed: Tensor<B, 5>,
        regularization: Option<f64>,
    ) -> Result<ModelPrediction<B>>;
}

/// Source of model parameters.
pub trait ModelLoader<B: Backend> {
    /// Model type produced by this loader.
    type Model: RegistrationModel<B>;

    /// Names of all parameters the loader can provide, `/`-separated.
    fn parameter_names(&self) -> Vec<String>;

    /// Construct the model.
    fn load(
        &self,
        variant: ModelVariant,
        extent: Extent,
        compute: &ComputeConfig,
    ) -> Result<Self::Model>;
}
