//! Perceptual distance capability interface.

use burn::tensor::{backend::Backend, cast::ToElement, Tensor};

use rvfi_model::{FeatureExtractor, PerceptualLoss};

/// A learned perceptual metric (an external collaborator such as an
/// AlexNet-feature LPIPS network). Identical frames measure zero.
pub trait PerceptualMetric<B: Backend> {
    fn distance(&self, pred: &Tensor<B, 4>, gt: &Tensor<B, 4>) -> f64;

    fn name(&self) -> &'static str {
        "perceptual"
    }
}

/// Feature-space distance over any [`FeatureExtractor`], for running the
/// benchmark without a dedicated perceptual network.
pub struct FeatureDistance<E> {
    extractor: E,
}

impl<E> FeatureDistance<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }
}

impl<B: Backend, E: FeatureExtractor<B>> PerceptualMetric<B> for FeatureDistance<E> {
    fn distance(&self, pred: &Tensor<B, 4>, gt: &Tensor<B, 4>) -> f64 {
        PerceptualLoss::new()
            .forward(&self.extractor, pred.clone(), gt.clone())
            .into_scalar()
            .to_f64()
    }

    fn name(&self) -> &'static str {
        "feature-l2"
    }
}

/// Reports zero for every pair; used when no perceptual collaborator is
/// wired in, so the benchmark output marks the column as disabled.
pub struct NullPerceptual;

impl<B: Backend> PerceptualMetric<B> for NullPerceptual {
    fn distance(&self, _pred: &Tensor<B, 4>, _gt: &Tensor<B, 4>) -> f64 {
        0.0
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
