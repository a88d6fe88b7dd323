pub mod resample;

pub use resample::{
    into_batch, normalize_min_max, LinearResampler, ResampleImageFilter, Resampler,
    SamplingTransform,
};
