//! Inference and training drivers.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdamW, AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use tracing::info;

use rvfi_core::pad::Alignment;

use crate::checkpoint;
use crate::error::{ModelError, Result};
use crate::flownet::{FlowCascade, FlowCascadeConfig, ScaleSchedule};
use crate::losses::{
    FeatureExtractor, HeatmapLoss, KeypointEstimator, LossBreakdown, LossWeights,
    PerceptualLoss, PhotometricLoss, SobelSmoothnessLoss,
};
use crate::synthesis::{self, blend, MultiFrameMode};
use crate::validation;

/// Interpolation model: flow cascade plus synthesis.
///
/// The compute device is an explicit construction parameter; there is no
/// ambient process-wide device state.
pub struct Model<B: Backend> {
    cascade: FlowCascade<B>,
    device: B::Device,
}

impl<B: Backend> Model<B> {
    /// Create a model with freshly initialized parameters on `device`.
    pub fn new(config: &FlowCascadeConfig, device: &B::Device) -> Self {
        Self {
            cascade: config.init(device),
            device: device.clone(),
        }
    }

    /// Wrap an existing cascade.
    pub fn from_cascade(cascade: FlowCascade<B>, device: &B::Device) -> Self {
        Self {
            cascade,
            device: device.clone(),
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn cascade(&self) -> &FlowCascade<B> {
        &self.cascade
    }

    /// Load parameters from a checkpoint file (non-strict).
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<()> {
        checkpoint::load_cascade(&mut self.cascade, path, &self.device)?;
        info!(path = %path.display(), "loaded checkpoint");
        Ok(())
    }

    /// Save parameters to a checkpoint file.
    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        checkpoint::save_cascade(&self.cascade, path)?;
        info!(path = %path.display(), "saved checkpoint");
        Ok(())
    }

    /// Interpolate one frame at `timestep` with the default schedule.
    pub fn infer(
        &self,
        img0: Tensor<B, 4>,
        img1: Tensor<B, 4>,
        timestep: f32,
    ) -> Result<Tensor<B, 4>> {
        self.infer_scheduled(img0, img1, timestep, &ScaleSchedule::default())
    }

    /// Interpolate one frame at `timestep` with an explicit schedule.
    ///
    /// Inputs of arbitrary size are padded to the cascade's alignment
    /// stride (replicate edge) and the output is stripped back, so the
    /// result always matches the input size exactly.
    pub fn infer_scheduled(
        &self,
        img0: Tensor<B, 4>,
        img1: Tensor<B, 4>,
        timestep: f32,
        schedule: &ScaleSchedule,
    ) -> Result<Tensor<B, 4>> {
        validation::validate_frame_pair(&img0, &img1)?;
        validation::validate_timestep(timestep)?;
        schedule.check_stages(self.cascade.num_stages())?;

        let [n, _, h, w] = img0.dims();
        let pad = Alignment::for_size(h, w, self.cascade.alignment());
        let img0 = pad.apply(img0);
        let img1 = pad.apply(img1);

        let t = Tensor::<B, 1>::from_floats([timestep], &self.device).repeat(&[n]);
        let output = self.cascade.forward(img0, img1, t, schedule);
        let (warped0, warped1) = output.final_warped();
        let frame = blend(
            warped0.clone(),
            warped1.clone(),
            output.final_mask_logits().clone(),
        );
        Ok(pad.strip(frame))
    }

    /// Produce the `2^factor_log2 - 1` evenly spaced frames between the
    /// inputs.
    pub fn interpolate_multi(
        &self,
        img0: &Tensor<B, 4>,
        img1: &Tensor<B, 4>,
        factor_log2: u32,
        mode: MultiFrameMode,
    ) -> Result<Vec<Tensor<B, 4>>> {
        synthesis::interpolate_sequence(img0, img1, factor_log2, mode, |a, b, t| {
            self.infer(a.clone(), b.clone(), t)
        })
    }
}

type CascadeOptimizer<B> = OptimizerAdaptor<AdamW, FlowCascade<B>, B>;

/// Training driver owning the model, optimizer and loss modules.
///
/// Gradient tracking exists only on the autodiff backend used here; for
/// evaluation, [`Trainer::valid_model`] yields an inner-backend model that
/// never records gradients. This replaces hidden train/eval mode toggles
/// with an explicit execution mode carried by the types.
pub struct Trainer<B: AutodiffBackend> {
    model: Model<B>,
    optimizer: CascadeOptimizer<B>,
    weights: LossWeights,
    schedule: ScaleSchedule,
    photometric: PhotometricLoss<B>,
    smoothness: SobelSmoothnessLoss<B>,
    perceptual: PerceptualLoss<B>,
    heatmap: HeatmapLoss<B>,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: &FlowCascadeConfig, weights: LossWeights, device: &B::Device) -> Self {
        let model = Model::new(config, device);
        let optimizer = AdamWConfig::new().with_weight_decay(1e-4).init();
        Self {
            model,
            optimizer,
            weights,
            schedule: ScaleSchedule::default(),
            photometric: PhotometricLoss::new(),
            smoothness: SobelSmoothnessLoss::new(device),
            perceptual: PerceptualLoss::new(),
            heatmap: HeatmapLoss::new(),
        }
    }

    /// Override the cascade schedule used during training.
    pub fn with_schedule(mut self, schedule: ScaleSchedule) -> Result<Self> {
        schedule.check_stages(self.model.cascade.num_stages())?;
        self.schedule = schedule;
        Ok(self)
    }

    pub fn model(&self) -> &Model<B> {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model<B> {
        &mut self.model
    }

    /// Inner-backend copy of the model for evaluation passes.
    pub fn valid_model(&self) -> Model<B::InnerBackend> {
        Model::from_cascade(self.model.cascade.valid(), &self.model.device)
    }

    /// One optimization step over a batch.
    ///
    /// `img0`/`img1`/`gt` are `[N, 3, H, W]`, `timesteps` is `[N]`. The
    /// composed loss is checked for finiteness before the backward pass; a
    /// non-finite loss aborts the step with an error instead of silently
    /// updating parameters with garbage gradients.
    #[allow(clippy::too_many_arguments)]
    pub fn train_step<E, K>(
        &mut self,
        img0: Tensor<B, 4>,
        img1: Tensor<B, 4>,
        gt: Tensor<B, 4>,
        timesteps: Tensor<B, 1>,
        learning_rate: f64,
        extractor: &E,
        keypoints: &K,
    ) -> Result<(Tensor<B, 4>, LossBreakdown<B>)>
    where
        E: FeatureExtractor<B>,
        K: KeypointEstimator<B>,
    {
        validation::validate_frame_pair(&img0, &img1)?;
        validation::validate_frame_pair(&img0, &gt)?;

        let [_, _, h, w] = img0.dims();
        let pad = Alignment::for_size(h, w, self.model.cascade.alignment());
        let aligned0 = pad.apply(img0);
        let aligned1 = pad.apply(img1);

        let output =
            self.model
                .cascade
                .forward(aligned0, aligned1, timesteps, &self.schedule);
        let (warped0, warped1) = output.final_warped();
        let pred = pad.strip(blend(
            warped0.clone(),
            warped1.clone(),
            output.final_mask_logits().clone(),
        ));

        let photometric = self.photometric.forward(pred.clone(), gt.clone());
        let smoothness = self.smoothness.forward(output.final_flow().clone());
        let perceptual = self
            .perceptual
            .forward(extractor, pred.clone(), gt.clone());
        let keypoint = self
            .heatmap
            .forward(keypoints.estimate(pred.clone()), keypoints.estimate(gt));

        let total = photometric.clone().mul_scalar(self.weights.photometric)
            + smoothness.clone().mul_scalar(self.weights.smoothness)
            + perceptual.clone().mul_scalar(self.weights.perceptual)
            + keypoint.clone().mul_scalar(self.weights.keypoint);

        let total_value = total.clone().into_scalar().to_f64();
        if !total_value.is_finite() {
            return Err(ModelError::numerical_instability(format!(
                "training loss is not finite: {total_value}"
            )));
        }

        let grads = total.backward();
        let grads = GradientsParams::from_grads(grads, &self.model.cascade);
        // Single writer: the optimizer step consumes and replaces the
        // cascade; nothing else mutates parameters.
        let cascade = self.model.cascade.clone();
        self.model.cascade = self.optimizer.step(learning_rate, cascade, grads);

        Ok((
            pred,
            LossBreakdown {
                photometric,
                smoothness,
                perceptual,
                keypoint,
                total,
            },
        ))
    }
}
