//! Coarse-to-fine flow estimation.
//!
//! ```text
//! img0, img1 ──► stage 0 (1/8) ──► stage 1 (1/4) ──► stage 2 (1/2) ──► stage 3 (1/1)
//!                   │                  │                 │                  │
//!                   ▼                  ▼                 ▼                  ▼
//!              flow, mask ──(+Δ)─► flow, mask ──(+Δ)─► ...  ──(+Δ)─►  final flow, mask
//!                   │                  │                                   │
//!                 warp               warp                                warp
//! ```
//!
//! Each stage sees only the frames warped by the previous stage's flow
//! estimate (strict causal refinement); the terminal full-resolution
//! stage's flow and mask feed the synthesizer.

use burn::module::Ignored;
use burn::prelude::*;

use rvfi_core::warp::backward_warp;

use super::block::{CascadeStage, CascadeStageConfig, FLOW_CHANNELS};
use super::schedule::ScaleSchedule;

/// Output of one full cascade pass.
///
/// All fields are indexed coarsest stage first. Flows are `[N, 4, H, W]`
/// (channels 0..2 map frame A toward the target instant, 2..4 frame B);
/// mask logits are `[N, 1, H, W]`, pre-sigmoid.
#[derive(Debug, Clone)]
pub struct CascadeOutput<B: Backend> {
    pub flows: Vec<Tensor<B, 4>>,
    pub mask_logits: Vec<Tensor<B, 4>>,
    pub warped: Vec<(Tensor<B, 4>, Tensor<B, 4>)>,
}

impl<B: Backend> CascadeOutput<B> {
    pub fn final_flow(&self) -> &Tensor<B, 4> {
        self.flows.last().expect("cascade has at least one stage")
    }

    pub fn final_mask_logits(&self) -> &Tensor<B, 4> {
        self.mask_logits
            .last()
            .expect("cascade has at least one stage")
    }

    pub fn final_warped(&self) -> &(Tensor<B, 4>, Tensor<B, 4>) {
        self.warped.last().expect("cascade has at least one stage")
    }
}

/// Configuration for the flow cascade.
#[derive(Config, Debug)]
pub struct FlowCascadeConfig {
    /// Feature width per stage, coarsest first.
    #[config(default = "vec![192, 128, 96, 64]")]
    pub stage_channels: Vec<usize>,
    /// Residual convolutions per stage.
    #[config(default = 8)]
    pub stage_depth: usize,
    /// Spatial dimensions must divide this stride before the cascade runs.
    #[config(default = 32)]
    pub alignment: usize,
}

impl FlowCascadeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FlowCascade<B> {
        let stages = self
            .stage_channels
            .iter()
            .map(|&channels| {
                CascadeStageConfig::new(channels)
                    .with_depth(self.stage_depth)
                    .init(device)
            })
            .collect();
        FlowCascade {
            stages,
            alignment: Ignored(self.alignment),
        }
    }

    /// Two-stage configuration small enough for unit tests.
    pub fn tiny() -> Self {
        Self {
            stage_channels: vec![16, 8],
            stage_depth: 2,
            alignment: 32,
        }
    }
}

/// Multi-scale iterative flow estimation network.
#[derive(Module, Debug)]
pub struct FlowCascade<B: Backend> {
    pub(crate) stages: Vec<CascadeStage<B>>,
    alignment: Ignored<usize>,
}

impl<B: Backend> FlowCascade<B> {
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn alignment(&self) -> usize {
        *self.alignment
    }

    /// Run the cascade.
    ///
    /// `img0`/`img1` are aligned `[N, 3, H, W]` frames; `timestep` holds a
    /// per-element position in `[0, 1]` as an `[N]` tensor. The schedule
    /// length must equal the stage count; the driver validates all of this
    /// before calling.
    pub fn forward(
        &self,
        img0: Tensor<B, 4>,
        img1: Tensor<B, 4>,
        timestep: Tensor<B, 1>,
        schedule: &ScaleSchedule,
    ) -> CascadeOutput<B> {
        let [n, _, h, w] = img0.dims();
        let device = img0.device();
        debug_assert_eq!(schedule.len(), self.stages.len());

        let t_plane =
            Tensor::ones([n, 1, h, w], &device) * timestep.reshape([n, 1, 1, 1]);

        let mut flow = Tensor::zeros([n, FLOW_CHANNELS, h, w], &device);
        let mut mask_logits = Tensor::zeros([n, 1, h, w], &device);
        let mut warped0 = img0.clone();
        let mut warped1 = img1.clone();

        let mut flows = Vec::with_capacity(self.stages.len());
        let mut masks = Vec::with_capacity(self.stages.len());
        let mut warped = Vec::with_capacity(self.stages.len());

        for (stage, &scale) in self.stages.iter().zip(schedule.factors()) {
            let cond = Tensor::cat(
                vec![
                    warped0.clone(),
                    warped1.clone(),
                    t_plane.clone(),
                    mask_logits.clone(),
                ],
                1,
            );
            let (flow_delta, mask_delta) = stage.forward(cond, flow.clone(), scale);
            flow = flow + flow_delta;
            mask_logits = mask_logits + mask_delta;

            // Re-warp the original sources, not the previous warps: the
            // running flow already composes every stage's contribution.
            warped0 = backward_warp(img0.clone(), flow.clone().slice([0..n, 0..2, 0..h, 0..w]));
            warped1 = backward_warp(img1.clone(), flow.clone().slice([0..n, 2..4, 0..h, 0..w]));

            flows.push(flow.clone());
            masks.push(mask_logits.clone());
            warped.push((warped0.clone(), warped1.clone()));
        }

        CascadeOutput {
            flows,
            mask_logits: masks,
            warped,
        }
    }
}
