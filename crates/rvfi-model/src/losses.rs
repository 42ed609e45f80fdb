//! Loss composition for joint motion/appearance training.
//!
//! The training objective combines a photometric term, a flow smoothness
//! regularizer and two collaborator-backed terms: a deep-feature perceptual
//! distance and a keypoint heatmap consistency term. The collaborators sit
//! behind narrow capability traits so the training loop is testable with
//! stubs.

use std::marker::PhantomData;

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};

/// Mean absolute reconstruction error.
#[derive(Module, Debug)]
pub struct PhotometricLoss<B: Backend> {
    phantom: PhantomData<B>,
}

impl<B: Backend> PhotometricLoss<B> {
    pub fn new() -> Self {
        Self {
            phantom: PhantomData,
        }
    }

    pub fn forward(&self, pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
        (pred - target).abs().mean()
    }
}

impl<B: Backend> Default for PhotometricLoss<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sobel smoothness penalty on flow fields.
///
/// Responds to the horizontal and vertical gradient magnitude of each flow
/// channel, favouring piecewise-smooth motion. The Sobel taps are fixed
/// weights, never trained.
#[derive(Module, Debug)]
pub struct SobelSmoothnessLoss<B: Backend> {
    kernels: Conv2d<B>,
}

impl<B: Backend> SobelSmoothnessLoss<B> {
    pub fn new(device: &B::Device) -> Self {
        let mut kernels = Conv2dConfig::new([1, 2], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);

        #[rustfmt::skip]
        let taps: [f32; 18] = [
            // horizontal gradient
            -1.0, 0.0, 1.0,
            -2.0, 0.0, 2.0,
            -1.0, 0.0, 1.0,
            // vertical gradient
            -1.0, -2.0, -1.0,
             0.0,  0.0,  0.0,
             1.0,  2.0,  1.0,
        ];
        let weight = Tensor::<B, 1>::from_floats(taps, device).reshape([2, 1, 3, 3]);
        kernels.weight = Param::from_tensor(weight);

        Self { kernels }
    }

    pub fn forward(&self, flow: Tensor<B, 4>) -> Tensor<B, 1> {
        let [n, c, h, w] = flow.dims();
        // Every flow channel is filtered as its own single-channel image.
        let planes = flow.reshape([n * c, 1, h, w]);
        self.kernels.forward(planes).abs().mean()
    }
}

/// Deep-feature activations from a fixed pretrained network.
///
/// External collaborator: the perceptual loss only needs activations at a
/// few depths for a `[N, 3, H, W]` batch.
pub trait FeatureExtractor<B: Backend> {
    fn features(&self, x: Tensor<B, 4>) -> Vec<Tensor<B, 4>>;
}

/// Distance between deep-feature activations of prediction and target.
#[derive(Module, Debug)]
pub struct PerceptualLoss<B: Backend> {
    phantom: PhantomData<B>,
}

impl<B: Backend> PerceptualLoss<B> {
    pub fn new() -> Self {
        Self {
            phantom: PhantomData,
        }
    }

    /// Mean squared feature distance, averaged across extractor levels.
    pub fn forward<E: FeatureExtractor<B>>(
        &self,
        extractor: &E,
        pred: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        let device = pred.device();
        let pred_features = extractor.features(pred);
        let target_features = extractor.features(target);
        debug_assert_eq!(pred_features.len(), target_features.len());

        let levels = pred_features.len();
        let mut total = Tensor::<B, 1>::zeros([1], &device);
        for (p, t) in pred_features.into_iter().zip(target_features) {
            total = total + (p - t).powf_scalar(2.0).mean();
        }
        if levels > 1 {
            total = total.div_scalar(levels as f32);
        }
        total
    }
}

impl<B: Backend> Default for PerceptualLoss<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keypoint heatmap estimation.
///
/// External collaborator: a fixed pose network producing per-keypoint
/// heatmaps `[N, K, H', W']` for a `[N, 3, H, W]` batch.
pub trait KeypointEstimator<B: Backend> {
    fn estimate(&self, x: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// MSE between predicted and target heatmaps.
///
/// Computed per keypoint channel and averaged over channels; since every
/// channel shares one spatial size this equals the global mean.
#[derive(Module, Debug)]
pub struct HeatmapLoss<B: Backend> {
    phantom: PhantomData<B>,
}

impl<B: Backend> HeatmapLoss<B> {
    pub fn new() -> Self {
        Self {
            phantom: PhantomData,
        }
    }

    pub fn forward(&self, pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
        debug_assert_eq!(pred.dims(), target.dims());
        (pred - target).powf_scalar(2.0).mean()
    }
}

impl<B: Backend> Default for HeatmapLoss<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed weights for the training objective.
#[derive(Config, Debug)]
pub struct LossWeights {
    #[config(default = "1.0")]
    pub photometric: f64,
    #[config(default = "0.1")]
    pub smoothness: f64,
    #[config(default = "1.0")]
    pub perceptual: f64,
    #[config(default = "0.1")]
    pub keypoint: f64,
}

/// Individual loss terms plus the weighted total, for monitoring.
#[derive(Debug, Clone)]
pub struct LossBreakdown<B: Backend> {
    pub photometric: Tensor<B, 1>,
    pub smoothness: Tensor<B, 1>,
    pub perceptual: Tensor<B, 1>,
    pub keypoint: Tensor<B, 1>,
    pub total: Tensor<B, 1>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    struct StubExtractor;

    impl FeatureExtractor<B> for StubExtractor {
        fn features(&self, x: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
            vec![x.clone(), x.mul_scalar(0.5)]
        }
    }

    #[test]
    fn test_photometric_zero_for_identical() {
        let device = Default::default();
        let loss = PhotometricLoss::<B>::new();
        let x = Tensor::random(
            [2, 3, 8, 8],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        assert_eq!(loss.forward(x.clone(), x).into_scalar(), 0.0);
    }

    #[test]
    fn test_photometric_known_value() {
        let device = Default::default();
        let loss = PhotometricLoss::<B>::new();
        let a = Tensor::<B, 4>::ones([1, 3, 4, 4], &device);
        let b = Tensor::<B, 4>::ones([1, 3, 4, 4], &device).mul_scalar(0.75);
        let value = loss.forward(a, b).into_scalar();
        assert!((value - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_smoothness_zero_for_constant_flow() {
        let device = Default::default();
        let loss = SobelSmoothnessLoss::<B>::new(&device);
        let flow = Tensor::<B, 4>::ones([1, 4, 8, 8], &device).mul_scalar(2.5);
        // Interior responses vanish on a constant field; only the implicit
        // zero padding at the border contributes.
        let interior_only = loss.forward(flow.clone()).into_scalar();
        let noisy = loss
            .forward(
                flow + Tensor::random(
                    [1, 4, 8, 8],
                    burn::tensor::Distribution::Uniform(-1.0, 1.0),
                    &device,
                ),
            )
            .into_scalar();
        assert!(noisy > interior_only);
    }

    #[test]
    fn test_perceptual_zero_for_identical() {
        let device = Default::default();
        let loss = PerceptualLoss::<B>::new();
        let x = Tensor::random(
            [1, 3, 8, 8],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let value = loss.forward(&StubExtractor, x.clone(), x).into_scalar();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_heatmap_loss_averages_channels() {
        let device = Default::default();
        let loss = HeatmapLoss::<B>::new();
        let pred = Tensor::<B, 4>::zeros([1, 2, 4, 4], &device);
        let target = Tensor::<B, 4>::ones([1, 2, 4, 4], &device);
        let value = loss.forward(pred, target).into_scalar();
        assert!((value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_weights() {
        let weights = LossWeights::new();
        assert_eq!(weights.photometric, 1.0);
        assert_eq!(weights.smoothness, 0.1);
        assert_eq!(weights.perceptual, 1.0);
        assert_eq!(weights.keypoint, 0.1);
    }
}
