//! Registration configuration.
//!
//! All settings are passed explicitly; nothing is read from the process
//! environment inside the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::initial::InitialTransform;
use crate::variant::ModelVariant;

/// Default regularization weight for deformable models.
pub const DEFAULT_REGULARIZATION: f64 = 0.5;

/// Side length of the cubic network grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Extent {
    /// 192³ voxels.
    E192,
    /// 256³ voxels.
    #[default]
    E256,
}

impl Extent {
    /// Voxels along each axis.
    pub fn side(self) -> usize {
        match self {
            Self::E192 => 192,
            Self::E256 => 256,
        }
    }

    /// Grid shape.
    pub fn shape(self) -> [usize; 3] {
        let n = self.side();
        [n, n, n]
    }
}

impl TryFrom<usize> for Extent {
    type Error = RegistrationError;

    fn try_from(side: usize) -> Result<Self> {
        match side {
            192 => Ok(Self::E192),
            256 => Ok(Self::E256),
            other => Err(RegistrationError::invalid_configuration(format!(
                "extent must be 192 or 256, got {other}"
            ))),
        }
    }
}

impl From<Extent> for usize {
    fn from(extent: Extent) -> usize {
        extent.side()
    }
}

/// Preferred compute device for the inference collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Cpu,
    Gpu,
}

/// Compute settings handed to the model loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Worker threads; `None` lets the backend decide.
    pub threads: Option<usize>,
    /// Device to run inference on.
    pub device: DevicePreference,
}

impl ComputeConfig {
    /// Create a compute config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the device preference.
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(RegistrationError::invalid_configuration(
                "thread count must be positive",
            ));
        }
        Ok(())
    }
}

/// Settings for a single registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Model variant to run.
    pub variant: ModelVariant,
    /// Network grid extent.
    pub extent: Extent,
    /// Regularization weight in `[0, 1]`, used by deformable variants.
    pub regularization: f64,
    /// Symmetrize the initial transform into a mid-space.
    pub mid_space: bool,
    /// Initial moving-to-fixed alignment.
    #[serde(skip)]
    pub initial: Option<InitialTransform>,
    /// Compute settings for the inference collaborator.
    pub compute: ComputeConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            extent: Extent::default(),
            regularization: DEFAULT_REGULARIZATION,
            mid_space: false,
            initial: None,
            compute: ComputeConfig::default(),
        }
    }
}

impl RegistrationConfig {
    /// Create a config for `variant` with default settings.
    pub fn new(variant: ModelVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Set the network extent.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    /// Set the regularization weight.
    pub fn with_regularization(mut self, lambda: f64) -> Self {
        self.regularization = lambda;
        self
    }

    /// Enable mid-space symmetrization.
    pub fn with_mid_space(mut self) -> Self {
        self.mid_space = true;
        self
    }

    /// Set the initial transform.
    pub fn with_initial(mut self, initial: InitialTransform) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Set compute settings.
    pub fn with_compute(mut self, compute: ComputeConfig) -> Self {
        self.compute = compute;
        self
    }

    /// Regularization passed to the model, if the variant takes one.
    pub fn model_regularization(&self) -> Option<f64> {
        self.variant
            .takes_regularization()
            .then_some(self.regularization)
    }

    /// Reject invalid settings before any work starts.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.regularization) {
            return Err(RegistrationError::invalid_configuration(format!(
                "regularization must be in [0, 1], got {}",
                self.regularization
            )));
        }
        if self.mid_space && self.initial.is_none() {
            return Err(RegistrationError::MissingInitialization);
        }
        self.compute.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistrationConfig::default();
        assert_eq!(config.variant, ModelVariant::Joint);
        assert_eq!(config.extent, Extent::E256);
        assert_eq!(config.regularization, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extent_set_is_closed() {
        assert_eq!(Extent::try_from(192).unwrap(), Extent::E192);
        assert_eq!(usize::from(Extent::E256), 256);
        assert!(matches!(
            Extent::try_from(160),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_regularization_bounds() {
        for lambda in [-0.1, 1.5, f64::NAN] {
            let config = RegistrationConfig::new(ModelVariant::Deform).with_regularization(lambda);
            assert!(config.validate().is_err(), "lambda {lambda} accepted");
        }
        let config = RegistrationConfig::new(ModelVariant::Deform).with_regularization(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mid_space_needs_initial() {
        let config = RegistrationConfig::new(ModelVariant::Affine).with_mid_space();
        assert_eq!(config.validate(), Err(RegistrationError::MissingInitialization));
    }

    #[test]
    fn test_regularization_only_for_dense_variants() {
        assert_eq!(RegistrationConfig::new(ModelVariant::Rigid).model_regularization(), None);
        assert_eq!(
            RegistrationConfig::new(ModelVariant::Joint)
                .with_regularization(0.2)
                .model_regularization(),
            Some(0.2)
        );
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = RegistrationConfig::default().with_compute(ComputeConfig::new().with_threads(0));
        assert!(config.validate().is_err());
    }
}
