//! Peak signal-to-noise ratio on the luma channel.

use burn::tensor::{backend::Backend, cast::ToElement, Tensor};

use rvfi_core::color::rgb_to_luma;

/// PSNR between prediction and ground truth, both `[N, 3, H, W]` in
/// `[0, 1]`.
///
/// Computed from luma mean-squared-error on the 8-bit scale,
/// `20 log10(255 / sqrt(mse))`, so values line up with codec-style PSNR
/// reports. Identical inputs yield `f64::INFINITY`.
pub fn luma_psnr<B: Backend>(pred: &Tensor<B, 4>, gt: &Tensor<B, 4>) -> f64 {
    let pred_y = rgb_to_luma(pred.clone()).mul_scalar(255.0);
    let gt_y = rgb_to_luma(gt.clone()).mul_scalar(255.0);
    let mse = (gt_y - pred_y)
        .powf_scalar(2.0)
        .mean()
        .into_scalar()
        .to_f64();
    if mse <= 0.0 {
        return f64::INFINITY;
    }
    20.0 * (255.0 / mse.sqrt()).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_identical_frames_are_infinite() {
        let device = Default::default();
        let frame = Tensor::<B, 4>::random(
            [1, 3, 8, 8],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        assert!(luma_psnr(&frame, &frame).is_infinite());
    }

    #[test]
    fn test_known_difference() {
        let device = Default::default();
        let black = Tensor::<B, 4>::zeros([1, 3, 8, 8], &device);
        let white = Tensor::<B, 4>::ones([1, 3, 8, 8], &device);
        // Luma difference is the full 255 everywhere, so mse = 255^2 and
        // the PSNR is exactly zero.
        let psnr = luma_psnr(&white, &black);
        assert!(psnr.abs() < 1e-9, "got {psnr}");
    }

    #[test]
    fn test_closer_prediction_scores_higher() {
        let device = Default::default();
        let gt = Tensor::<B, 4>::ones([1, 3, 8, 8], &device).mul_scalar(0.5);
        let near = Tensor::<B, 4>::ones([1, 3, 8, 8], &device).mul_scalar(0.52);
        let far = Tensor::<B, 4>::ones([1, 3, 8, 8], &device).mul_scalar(0.7);
        assert!(luma_psnr(&near, &gt) > luma_psnr(&far, &gt));
    }
}
