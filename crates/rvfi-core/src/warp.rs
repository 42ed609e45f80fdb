use burn::tensor::{backend::Backend, Int, Tensor};

/// Backward warp by a dense displacement field.
///
/// `source` is `[N, C, H, W]`; `flow` is `[N, 2, H, W]` with channel 0 the
/// horizontal (x) displacement and channel 1 the vertical (y) displacement,
/// both in pixels. Each output pixel samples
/// `source[y + flow_y, x + flow_x]` with bilinear interpolation; sample
/// coordinates outside the image replicate the border.
///
/// Pure and batched; gradients flow through the bilinear weights.
pub fn backward_warp<B: Backend>(source: Tensor<B, 4>, flow: Tensor<B, 4>) -> Tensor<B, 4> {
    let [n, _c, h, w] = source.dims();
    let [fn_, fc, fh, fw] = flow.dims();
    assert_eq!(
        (fn_, fh, fw),
        (n, h, w),
        "flow resolution must match the source"
    );
    assert_eq!(fc, 2, "displacement fields have 2 channels");
    let device = source.device();

    let flow_x = flow.clone().slice([0..n, 0..1, 0..h, 0..w]);
    let flow_y = flow.slice([0..n, 1..2, 0..h, 0..w]);

    // Broadcastable coordinate ranges; adding the displacement yields the
    // absolute sample position per pixel without materializing a full grid.
    let x_range = Tensor::arange(0..w as i64, &device)
        .float()
        .reshape([1, 1, 1, w]);
    let y_range = Tensor::arange(0..h as i64, &device)
        .float()
        .reshape([1, 1, h, 1]);

    let sample_x = flow_x + x_range;
    let sample_y = flow_y + y_range;

    bilinear_sample(source, sample_x, sample_y)
}

/// Sample `source` at fractional pixel coordinates with bilinear
/// interpolation, clamping coordinates to the image border.
///
/// `x` and `y` are `[N, 1, H, W]` coordinate tensors in pixels.
pub fn bilinear_sample<B: Backend>(
    source: Tensor<B, 4>,
    x: Tensor<B, 4>,
    y: Tensor<B, 4>,
) -> Tensor<B, 4> {
    let [n, c, h, w] = source.dims();

    let x0 = x.clone().floor();
    let y0 = y.clone().floor();

    // Fractional weights taken before clamping: a clamped corner pair
    // collapses to the same texel, so border samples replicate the edge.
    let wx1 = x.sub(x0.clone());
    let wy1 = y.sub(y0.clone());
    let wx0 = wx1.clone().neg().add_scalar(1.0);
    let wy0 = wy1.clone().neg().add_scalar(1.0);

    let x0_idx = x0.clone().clamp(0.0, (w - 1) as f32).int();
    let x1_idx = x0.add_scalar(1.0).clamp(0.0, (w - 1) as f32).int();
    let y0_idx = y0.clone().clamp(0.0, (h - 1) as f32).int();
    let y1_idx = y0.add_scalar(1.0).clamp(0.0, (h - 1) as f32).int();

    // Flatten once and gather the four corners by linear index.
    let flat = source.reshape([n, c, h * w]);
    let stride_y = w as i32;

    let y0_off = y0_idx.mul_scalar(stride_y);
    let y1_off = y1_idx.mul_scalar(stride_y);

    let gather_at = |idx: Tensor<B, 4, Int>| -> Tensor<B, 4> {
        let idx = idx.reshape([n, 1, h * w]).repeat(&[1, c, 1]);
        flat.clone().gather(2, idx).reshape([n, c, h, w])
    };

    let v00 = gather_at(y0_off.clone() + x0_idx.clone());
    let v01 = gather_at(y0_off + x1_idx.clone());
    let v10 = gather_at(y1_off.clone() + x0_idx);
    let v11 = gather_at(y1_off + x1_idx);

    let top = v00 * wx0.clone() + v01 * wx1.clone();
    let bottom = v10 * wx0 + v11 * wx1;

    top * wy0 + bottom * wy1
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn gradient_image(h: usize, w: usize, device: &<B as Backend>::Device) -> Tensor<B, 4> {
        let values: Vec<f32> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (y * w + x) as f32))
            .collect();
        Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([1, 1, h, w])
    }

    #[test]
    fn test_zero_flow_is_identity() {
        let device = Default::default();
        let img = gradient_image(6, 6, &device);
        let flow = Tensor::<B, 4>::zeros([1, 2, 6, 6], &device);

        let warped = backward_warp(img.clone(), flow);
        let diff = (warped - img).abs().max().into_scalar();
        assert!(diff < 1e-6, "zero flow changed the image by {diff}");
    }

    #[test]
    fn test_integer_shift() {
        let device = Default::default();
        let img = gradient_image(4, 4, &device);
        // Shift sampling one pixel to the right: out[y, x] = in[y, x + 1].
        let ones = Tensor::<B, 4>::ones([1, 1, 4, 4], &device);
        let flow = Tensor::cat(vec![ones, Tensor::zeros([1, 1, 4, 4], &device)], 1);

        let warped = backward_warp(img.clone(), flow);
        let interior = warped.slice([0..1, 0..1, 0..4, 0..3]);
        let expected = img.slice([0..1, 0..1, 0..4, 1..4]);
        let diff = (interior - expected).abs().max().into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_out_of_range_clamps_to_border() {
        let device = Default::default();
        let img = gradient_image(4, 4, &device);
        // Push every sample far off the right edge; output must replicate
        // the last column instead of failing.
        let flow_x = Tensor::<B, 4>::ones([1, 1, 4, 4], &device).mul_scalar(100.0);
        let flow = Tensor::cat(vec![flow_x, Tensor::zeros([1, 1, 4, 4], &device)], 1);

        let warped = backward_warp(img.clone(), flow);
        let edge = img.slice([0..1, 0..1, 0..4, 3..4]).repeat(&[1, 1, 1, 4]);
        let diff = (warped - edge).abs().max().into_scalar();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_small_flow_round_trip() {
        let device = Default::default();
        // A smooth image so that warping by +f then -f is nearly invertible.
        let values: Vec<f32> = (0..8)
            .flat_map(|y| (0..8).map(move |x| ((x + y) as f32) * 0.1))
            .collect();
        let img = Tensor::<B, 1>::from_floats(values.as_slice(), &device).reshape([1, 1, 8, 8]);
        let flow = Tensor::<B, 4>::ones([1, 2, 8, 8], &device).mul_scalar(0.25);

        let there = backward_warp(img.clone(), flow.clone());
        let back = backward_warp(there, flow.neg());

        // Ignore a one-pixel border where clamping breaks invertibility.
        let inner = |t: Tensor<B, 4>| t.slice([0..1, 0..1, 1..7, 1..7]);
        let diff = (inner(back) - inner(img)).abs().max().into_scalar();
        assert!(diff < 0.06, "round trip error too large: {diff}");
    }

    #[test]
    fn test_batched_inputs() {
        let device = Default::default();
        let img = gradient_image(4, 4, &device).repeat(&[3, 2, 1, 1]);
        let flow = Tensor::<B, 4>::zeros([3, 2, 4, 4], &device);

        let warped = backward_warp(img.clone(), flow);
        assert_eq!(warped.dims(), [3, 2, 4, 4]);
        let diff = (warped - img).abs().max().into_scalar();
        assert!(diff < 1e-6);
    }
}
