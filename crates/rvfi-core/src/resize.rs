use burn::tensor::{
    backend::Backend,
    module::interpolate,
    ops::{InterpolateMode, InterpolateOptions},
    Tensor,
};

/// Bilinear resize of a `[N, C, H, W]` batch to an explicit output size.
pub fn resize_bilinear<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [_, _, h, w] = x.dims();
    if [h, w] == size {
        return x;
    }
    interpolate(x, size, InterpolateOptions::new(InterpolateMode::Bilinear))
}

/// Nearest-neighbor resize of a `[N, C, H, W]` batch.
pub fn resize_nearest<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [_, _, h, w] = x.dims();
    if [h, w] == size {
        return x;
    }
    interpolate(x, size, InterpolateOptions::new(InterpolateMode::Nearest))
}

/// Resize a displacement field, rescaling displacement magnitudes to the
/// new resolution.
///
/// The field has an even channel count, laid out as (x, y) pairs; x
/// displacements scale with width, y displacements with height.
pub fn resize_flow<B: Backend>(flow: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [_, _, h, w] = flow.dims();
    let [nh, nw] = size;
    if [h, w] == size {
        return flow;
    }
    let resized = interpolate(
        flow,
        size,
        InterpolateOptions::new(InterpolateMode::Bilinear),
    );
    scale_flow(resized, nw as f32 / w as f32, nh as f32 / h as f32)
}

/// Multiply x/y displacement channels by separate factors.
pub fn scale_flow<B: Backend>(flow: Tensor<B, 4>, sx: f32, sy: f32) -> Tensor<B, 4> {
    if sx == sy {
        return flow.mul_scalar(sx);
    }
    let [n, c, h, w] = flow.dims();
    assert_eq!(c % 2, 0, "displacement fields have (x, y) channel pairs");
    let mut parts = Vec::with_capacity(c);
    for pair in 0..c / 2 {
        let x = flow
            .clone()
            .slice([0..n, 2 * pair..2 * pair + 1, 0..h, 0..w])
            .mul_scalar(sx);
        let y = flow
            .clone()
            .slice([0..n, 2 * pair + 1..2 * pair + 2, 0..h, 0..w])
            .mul_scalar(sy);
        parts.push(x);
        parts.push(y);
    }
    Tensor::cat(parts, 1)
}
