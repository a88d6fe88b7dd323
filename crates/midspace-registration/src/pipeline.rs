//! Single-shot registration pipeline around the inference call.
//!
//! Order is fixed: validation, network spaces, initial-transform folding,
//! resampling, inference, composition. Every check that can fail without
//! touching image data runs before resampling starts.

use burn::tensor::backend::Backend;
use midspace_core::filter::{ResampleImageFilter, Resampler, SamplingTransform};
use midspace_core::transform::compose_all;
use midspace_core::{ImageGeometry, Volume};
use tracing::{debug, error, info};

use crate::composer::TransformComposer;
use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::model::RegistrationModel;
use crate::network_space::{NetworkSpaceBuilder, NetworkSpaces};
use crate::output::RegistrationOutput;

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validation,
    NetworkSpaces,
    Initialization,
    Resampling,
    Inference,
    Composition,
}

/// Where a pipeline is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// Not run yet.
    Ready,
    /// Executing the given stage.
    Running(Stage),
    /// Produced a full transform pair.
    Success,
    /// Aborted; nothing was produced.
    Failed(RegistrationError),
}

/// Registers a moving volume to a fixed volume through network space.
///
/// # Type Parameters
/// * `R` - Resampler used to move volumes into network space
pub struct RegistrationPipeline<R> {
    config: RegistrationConfig,
    resampler: R,
    state: PipelineState,
    stages: Vec<Stage>,
}

impl<R> RegistrationPipeline<R> {
    pub fn new(config: RegistrationConfig, resampler: R) -> Self {
        Self {
            config,
            resampler,
            state: PipelineState::Ready,
            stages: Vec::new(),
        }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Stages entered during the last run.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Network spaces for a pair of geometries, with any initial transform
    /// folded in. Pure: touches no image data and no pipeline state.
    pub fn plan(&self, moving: &ImageGeometry, fixed: &ImageGeometry) -> Result<NetworkSpaces> {
        self.config.validate()?;
        self.check_initial(moving, fixed)?;
        let spaces = self.build_spaces(moving, fixed)?;
        self.fold_initial(spaces, moving, fixed)
    }

    /// Run the full pipeline.
    pub fn run<B, M>(
        &mut self,
        model: &M,
        moving: &Volume<B>,
        fixed: &Volume<B>,
    ) -> Result<RegistrationOutput<B>>
    where
        B: Backend,
        R: Resampler<B>,
        M: RegistrationModel<B>,
    {
        self.stages.clear();
        info!(
            variant = %self.config.variant,
            extent = self.config.extent.side(),
            mid_space = self.config.mid_space,
            initial = self.config.initial.is_some(),
            "starting registration"
        );

        match self.execute(model, moving, fixed) {
            Ok(output) => {
                self.state = PipelineState::Success;
                info!("registration finished");
                Ok(output)
            }
            Err(err) => {
                error!(stage = ?self.stages.last(), "registration failed: {err}");
                self.state = PipelineState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn execute<B, M>(
        &mut self,
        model: &M,
        moving: &Volume<B>,
        fixed: &Volume<B>,
    ) -> Result<RegistrationOutput<B>>
    where
        B: Backend,
        R: Resampler<B>,
        M: RegistrationModel<B>,
    {
        self.enter(Stage::Validation);
        self.config.validate()?;
        if model.variant() != self.config.variant {
            return Err(RegistrationError::invalid_configuration(format!(
                "configured for {} but the model is {}",
                self.config.variant,
                model.variant()
            )));
        }
        moving.validate()?;
        fixed.validate()?;
        let (mov_geom, fix_geom) = (moving.geometry(), fixed.geometry());
        self.check_initial(mov_geom, fix_geom)?;

        self.enter(Stage::NetworkSpaces);
        let spaces = self.build_spaces(mov_geom, fix_geom)?;

        self.enter(Stage::Initialization);
        let spaces = self.fold_initial(spaces, mov_geom, fix_geom)?;

        self.enter(Stage::Resampling);
        let filter = ResampleImageFilter::new(&self.resampler, self.config.extent.shape())
            .with_normalization();
        let mov_input = filter.apply_batched(
            &moving.frame(),
            SamplingTransform::Matrix(spaces.moving.net_to_vox()),
        )?;
        let fix_input = filter.apply_batched(
            &fixed.frame(),
            SamplingTransform::Matrix(spaces.fixed.net_to_vox()),
        )?;
        debug!(shape = ?mov_input.dims(), "network inputs ready");

        self.enter(Stage::Inference);
        let prediction = model.predict(mov_input, fix_input, self.config.model_regularization())?;

        self.enter(Stage::Composition);
        TransformComposer::new(&spaces, mov_geom, fix_geom).compose(prediction, self.config.variant)
    }

    fn enter(&mut self, stage: Stage) {
        debug!(?stage, "entering stage");
        self.stages.push(stage);
        self.state = PipelineState::Running(stage);
    }

    fn check_initial(&self, moving: &ImageGeometry, fixed: &ImageGeometry) -> Result<()> {
        match &self.config.initial {
            Some(initial) => initial.validate(moving, fixed),
            None => Ok(()),
        }
    }

    fn build_spaces(&self, moving: &ImageGeometry, fixed: &ImageGeometry) -> Result<NetworkSpaces> {
        let builder = NetworkSpaceBuilder::new(self.config.extent);
        let fixed_space = builder.build(fixed)?;
        let moving_space = if self.config.variant.centers_on_fixed() {
            debug!("centering moving network space on the fixed image");
            builder.build_centered_on(moving, fixed)?
        } else {
            builder.build(moving)?
        };
        Ok(NetworkSpaces {
            moving: moving_space,
            fixed: fixed_space,
        })
    }

    /// Fold the initial transform into both network spaces.
    ///
    /// With mid-space symmetrization the fixed side takes the principal
    /// square root and the moving side its inverse, so both sides meet
    /// halfway.
    fn fold_initial(
        &self,
        spaces: NetworkSpaces,
        moving: &ImageGeometry,
        fixed: &ImageGeometry,
    ) -> Result<NetworkSpaces> {
        let Some(initial) = &self.config.initial else {
            if self.config.mid_space {
                return Err(RegistrationError::MissingInitialization);
            }
            return Ok(spaces);
        };

        let init_vox = initial.to_voxel();
        let mut init_net = compose_all(&[
            *spaces.fixed.vox_to_net(),
            init_vox,
            *spaces.moving.net_to_vox(),
        ]);
        debug!(
            det = init_net.determinant(),
            moving = ?moving.shape(),
            fixed = ?fixed.shape(),
            "initial transform in network space"
        );

        let mut fixed_space = spaces.fixed;
        if self.config.mid_space {
            init_net = init_net.sqrtm().inspect_err(|err| error!("mid-space symmetrization failed: {err}"))?;
            fixed_space = fixed_space.fold(&init_net)?;
            info!("folded half transform into fixed network space");
        }
        let moving_space = spaces.moving.fold(&init_net.inverse()?)?;

        Ok(NetworkSpaces {
            moving: moving_space,
            fixed: fixed_space,
        })
    }
}
