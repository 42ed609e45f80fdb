use burn::tensor::{backend::Backend, Tensor};

/// BT.601 luma extraction: `[N, 3, H, W]` RGB to `[N, 1, H, W]`.
///
/// Matches the Y channel of an RGB to YUV conversion, which is what the
/// benchmark PSNR is computed on.
pub fn rgb_to_luma<B: Backend>(frames: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, c, _, _] = frames.dims();
    assert_eq!(c, 3, "luma extraction expects RGB input");
    let device = frames.device();
    let weights =
        Tensor::<B, 1>::from_floats([0.299, 0.587, 0.114], &device).reshape([1, 3, 1, 1]);
    (frames * weights).sum_dim(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_white_has_unit_luma() {
        let device = Default::default();
        let white = Tensor::<B, 4>::ones([1, 3, 2, 2], &device);
        let luma = rgb_to_luma(white);
        assert_eq!(luma.dims(), [1, 1, 2, 2]);
        let diff = (luma - Tensor::<B, 4>::ones([1, 1, 2, 2], &device))
            .abs()
            .max()
            .into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_pure_green_weight() {
        let device = Default::default();
        let mut rgb = vec![0.0f32; 3];
        rgb[1] = 1.0;
        let green = Tensor::<B, 1>::from_floats(rgb.as_slice(), &device).reshape([1, 3, 1, 1]);
        let luma = rgb_to_luma(green).into_scalar();
        assert!((luma - 0.587).abs() < 1e-6);
    }
}
