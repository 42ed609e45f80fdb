//! Benchmarking for frame interpolation models.
//!
//! Runs a model over held-out clips of extracted frames and reports luma
//! PSNR plus a perceptual distance per clip and overall.

pub mod clip;
pub mod perceptual;
pub mod psnr;
pub mod runner;

pub use perceptual::{FeatureDistance, NullPerceptual, PerceptualMetric};
pub use psnr::luma_psnr;
pub use runner::{run_benchmark, BenchmarkConfig, BenchmarkReport, ClipReport};
