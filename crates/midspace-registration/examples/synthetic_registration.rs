//! Synthetic Registration Example
//!
//! Registers two Gaussian blobs placed on differently oriented grids using a
//! centroid-matching stand-in for the inference model, then reports the
//! recovered world-space translation.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example synthetic_registration

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use midspace_core::filter::LinearResampler;
use midspace_core::image::generate_grid;
use midspace_core::transform::TransformSpace;
use midspace_core::{AffineTransform, ImageGeometry, Matrix3, Orientation, Point3, Vector3, Volume};
use midspace_registration::{
    load_model, ComputeConfig, Extent, ModelLoader, ModelOutput, ModelPrediction, ModelVariant,
    RegistrationConfig, RegistrationError, RegistrationModel, RegistrationPipeline,
};
use tracing_subscriber::EnvFilter;

type B = NdArray<f32>;

/// Aligns intensity centroids with a pure translation.
struct CentroidModel;

impl<Bk: Backend> RegistrationModel<Bk> for CentroidModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Affine
    }

    fn predict(
        &self,
        moving: Tensor<Bk, 5>,
        fixed: Tensor<Bk, 5>,
        _regularization: Option<f64>,
    ) -> midspace_registration::Result<ModelPrediction<Bk>> {
        let shift = centroid(moving)? - centroid(fixed)?;
        let forward = AffineTransform::from_parts(Matrix3::identity(), shift);
        Ok(ModelPrediction {
            forward: ModelOutput::Matrix(forward),
            backward: ModelOutput::Matrix(forward.inverse()?),
        })
    }
}

struct CentroidLoader;

impl<Bk: Backend> ModelLoader<Bk> for CentroidLoader {
    type Model = CentroidModel;

    fn parameter_names(&self) -> Vec<String> {
        vec!["affine/centroid".to_string()]
    }

    fn load(
        &self,
        variant: ModelVariant,
        _extent: Extent,
        _compute: &ComputeConfig,
    ) -> midspace_registration::Result<CentroidModel> {
        if variant != ModelVariant::Affine {
            return Err(RegistrationError::weight_load(format!(
                "no {variant} weights available"
            )));
        }
        Ok(CentroidModel)
    }
}

fn centroid<Bk: Backend>(volume: Tensor<Bk, 5>) -> midspace_registration::Result<Vector3> {
    let [_, _, d0, d1, d2] = volume.dims();
    let weights = volume.reshape([d0 * d1 * d2, 1]);
    let grid = generate_grid::<Bk>([d0, d1, d2], &weights.device());

    let total: f64 = weights.clone().sum().into_data().iter::<f64>().sum();
    if total <= 0.0 {
        return Err(RegistrationError::inference("input volume is empty"));
    }
    let sums: Vec<f64> = (grid * weights).sum_dim(0).into_data().iter::<f64>().collect();
    Ok(Vector3::new(sums[0], sums[1], sums[2]) / total)
}

fn blob(geometry: ImageGeometry, position: Point3, sigma: f64) -> Volume<B> {
    let device = Default::default();
    let [d0, d1, d2] = geometry.shape();
    let mut data = Vec::with_capacity(d0 * d1 * d2);
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                let world = geometry.voxel_to_world(&Point3::new(i as f64, j as f64, k as f64));
                let r2 = (world - position).norm_squared();
                data.push((-r2 / (2.0 * sigma * sigma)).exp() as f32);
            }
        }
    }
    Volume::from_frame(
        Tensor::from_data(TensorData::new(data, Shape::new([d0, d1, d2])), &device),
        geometry,
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Synthetic Network-Space Registration");
    println!("====================================\n");

    let fixed_geom = ImageGeometry::with_orientation(
        [48, 48, 48],
        Vector3::new(2.0, 2.0, 2.0),
        Orientation::RAS,
        Point3::origin(),
    )?;
    let moving_geom = ImageGeometry::with_orientation(
        [40, 44, 40],
        Vector3::new(2.5, 2.25, 2.5),
        "LPS".parse()?,
        Point3::new(6.0, -4.0, 2.0),
    )?;

    let fixed = blob(fixed_geom.clone(), Point3::new(5.0, 0.0, -3.0), 8.0);
    let moving = blob(moving_geom.clone(), Point3::new(-4.0, 6.0, 2.0), 8.0);
    let expected = Vector3::new(9.0, -6.0, -5.0);

    println!("Fixed:  {:?} voxels, orientation {}", fixed_geom.shape(), fixed_geom.orientation());
    println!("Moving: {:?} voxels, orientation {}", moving_geom.shape(), moving_geom.orientation());

    let config = RegistrationConfig::new(ModelVariant::Affine)
        .with_extent(Extent::E192)
        .with_compute(ComputeConfig::new().with_threads(1));
    let model: CentroidModel = load_model::<B, _>(&CentroidLoader, &config)?;

    let mut pipeline = RegistrationPipeline::new(config, LinearResampler::new());
    let output = pipeline.run(&model, &moving, &fixed)?;

    let world = output.forward.matrix_in(TransformSpace::World)?;
    let recovered = world.translation();
    println!("\nRecovered translation (mm): [{:.3}, {:.3}, {:.3}]", recovered.x, recovered.y, recovered.z);
    println!("Expected translation  (mm): [{:.3}, {:.3}, {:.3}]", expected.x, expected.y, expected.z);
    println!("Error (mm): {:.4}", (recovered - expected).norm());

    let moved = output.forward.resample(&moving, &LinearResampler::new())?;
    println!("Moved image on fixed grid: {:?}", moved.geometry().shape());

    let aligned = output.forward.aligned_source_geometry()?;
    println!("Header-aligned moving center: {:?}", aligned.center());

    Ok(())
}
