//! Network-space registration pipeline.
//!
//! Builds a canonical network grid per image, folds an optional initial
//! alignment (optionally symmetrized into a mid-space), resamples both
//! images for an external inference model and composes the model's
//! outputs back into transforms between the native voxel spaces.

pub mod error;
pub mod config;
pub mod variant;
pub mod network_space;
pub mod initial;
pub mod model;
pub mod weights;
pub mod composer;
pub mod output;
pub mod pipeline;

pub use error::{RegistrationError, Result};
pub use config::{ComputeConfig, DevicePreference, Extent, RegistrationConfig};
pub use variant::{ModelVariant, OutputKind};
pub use network_space::{NetworkSpace, NetworkSpaceBuilder, NetworkSpaces};
pub use initial::InitialTransform;
pub use model::{ModelLoader, ModelOutput, ModelPrediction, RegistrationModel};
pub use weights::{load_model, WeightGroup, WeightLayout};
pub use composer::TransformComposer;
pub use output::{RegisteredTransform, RegistrationOutput};
pub use pipeline::{PipelineState, RegistrationPipeline, Stage};
