//! A single refinement stage of the flow cascade.

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use rvfi_core::resize::{resize_bilinear, resize_flow};

/// Conditioning channels: two warped frames, a timestep plane and the
/// running mask logit.
pub const STAGE_COND_CHANNELS: usize = 8;
/// Running bidirectional flow channels appended to the conditioning input.
pub const FLOW_CHANNELS: usize = 4;
/// Stage output: four flow deltas plus one mask logit delta.
const HEAD_CHANNELS: usize = 5;

/// Configuration for one cascade stage.
#[derive(Config, Debug)]
pub struct CascadeStageConfig {
    /// Feature width of the stage.
    pub channels: usize,
    /// Number of residual convolutions between encoder and head.
    #[config(default = 8)]
    pub depth: usize,
}

impl CascadeStageConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CascadeStage<B> {
        let c = self.channels;
        let conv0 = Conv2dConfig::new([STAGE_COND_CHANNELS + FLOW_CHANNELS, c / 2], [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv1 = Conv2dConfig::new([c / 2, c], [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let blocks = (0..self.depth)
            .map(|_| ResidualConv::new(c, device))
            .collect();

        // 4x4 stride-2 transpose conv; the remaining upsampling back to
        // frame resolution happens in the forward pass.
        let head = ConvTranspose2dConfig::new([c, HEAD_CHANNELS], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);
        // The head starts at zero: an untrained stage contributes no flow
        // and no mask change, so the cascade begins as an identity
        // refinement.
        let head = zeroed_head(head, device);

        CascadeStage {
            conv0,
            conv1,
            blocks,
            head,
            activation: Relu::new(),
        }
    }
}

fn zeroed_head<B: Backend>(
    mut head: ConvTranspose2d<B>,
    device: &B::Device,
) -> ConvTranspose2d<B> {
    let weight_dims = head.weight.val().dims();
    head.weight = Param::from_tensor(Tensor::zeros(weight_dims, device));
    if let Some(bias) = &head.bias {
        let bias_dims = bias.val().dims();
        head.bias = Some(Param::from_tensor(Tensor::zeros(bias_dims, device)));
    }
    head
}

/// 3x3 convolution with a skip connection.
#[derive(Module, Debug)]
pub struct ResidualConv<B: Backend> {
    pub(crate) conv: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ResidualConv<B> {
    fn new(channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([channels, channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            activation: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        x.clone() + self.activation.forward(self.conv.forward(x))
    }
}

/// One resolution level of the coarse-to-fine refinement pipeline.
///
/// The stage receives the full-resolution conditioning stack (warped
/// frames, timestep plane, mask logit) and running flow, works at `1/scale`
/// of that resolution internally, and emits full-resolution flow and mask
/// residuals with displacement magnitudes rescaled on each resolution hop.
#[derive(Module, Debug)]
pub struct CascadeStage<B: Backend> {
    pub(crate) conv0: Conv2d<B>,
    pub(crate) conv1: Conv2d<B>,
    pub(crate) blocks: Vec<ResidualConv<B>>,
    pub(crate) head: ConvTranspose2d<B>,
    activation: Relu,
}

impl<B: Backend> CascadeStage<B> {
    /// Compute the stage's flow and mask residuals.
    ///
    /// `cond` is `[N, 8, H, W]`, `flow` is `[N, 4, H, W]`; `H` and `W` must
    /// be divisible by `4 * scale` (guaranteed by the driver's alignment
    /// padding for power-of-two schedules).
    pub fn forward(
        &self,
        cond: Tensor<B, 4>,
        flow: Tensor<B, 4>,
        scale: usize,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let [_, _, h, w] = cond.dims();
        let stage_size = [h / scale, w / scale];

        let cond = resize_bilinear(cond, stage_size);
        let flow_scaled = resize_flow(flow, stage_size);
        let x = Tensor::cat(vec![cond, flow_scaled], 1);

        let x = self.activation.forward(self.conv0.forward(x));
        let mut feat = self.activation.forward(self.conv1.forward(x));
        for block in &self.blocks {
            feat = block.forward(feat);
        }

        // Head output sits at half the stage resolution; bring it back to
        // frame resolution and rescale the displacement deltas to match.
        let out = self.head.forward(feat);
        let out = resize_bilinear(out, [h, w]);

        let [n, _, _, _] = out.dims();
        let flow_delta = out
            .clone()
            .slice([0..n, 0..FLOW_CHANNELS, 0..h, 0..w])
            .mul_scalar((scale * 2) as f32);
        let mask_delta = out.slice([0..n, FLOW_CHANNELS..HEAD_CHANNELS, 0..h, 0..w]);
        (flow_delta, mask_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_stage_output_shapes() {
        let device = Default::default();
        let stage = CascadeStageConfig::new(16)
            .with_depth(2)
            .init::<TestBackend>(&device);

        let cond = Tensor::<TestBackend, 4>::zeros([2, STAGE_COND_CHANNELS, 32, 64], &device);
        let flow = Tensor::<TestBackend, 4>::zeros([2, FLOW_CHANNELS, 32, 64], &device);

        for scale in [1usize, 2, 4] {
            let (flow_delta, mask_delta) = stage.forward(cond.clone(), flow.clone(), scale);
            assert_eq!(flow_delta.dims(), [2, 4, 32, 64]);
            assert_eq!(mask_delta.dims(), [2, 1, 32, 64]);
        }
    }

    #[test]
    fn test_fresh_stage_is_identity_refinement() {
        let device = Default::default();
        let stage = CascadeStageConfig::new(16)
            .with_depth(2)
            .init::<TestBackend>(&device);

        let cond = Tensor::<TestBackend, 4>::random(
            [1, STAGE_COND_CHANNELS, 32, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let flow = Tensor::<TestBackend, 4>::zeros([1, FLOW_CHANNELS, 32, 32], &device);

        let (flow_delta, mask_delta) = stage.forward(cond, flow, 2);
        assert_eq!(flow_delta.abs().max().into_scalar(), 0.0);
        assert_eq!(mask_delta.abs().max().into_scalar(), 0.0);
    }
}
