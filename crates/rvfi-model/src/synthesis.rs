//! Frame synthesis from warped sources and blend masks.

use std::collections::VecDeque;

use burn::tensor::{activation::sigmoid, backend::Backend, Tensor};

use crate::error::Result;

/// Blend two warped source frames with a mask logit field.
///
/// `output = sigmoid(mask) * warped0 + (1 - sigmoid(mask)) * warped1`,
/// clamped to the valid pixel range after blending.
pub fn blend<B: Backend>(
    warped0: Tensor<B, 4>,
    warped1: Tensor<B, 4>,
    mask_logits: Tensor<B, 4>,
) -> Tensor<B, 4> {
    let mask = sigmoid(mask_logits);
    let inverse = mask.clone().neg().add_scalar(1.0);
    (warped0 * mask + warped1 * inverse).clamp(0.0, 1.0)
}

/// Strategy for producing `2^k - 1` evenly spaced intermediate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiFrameMode {
    /// Query the cascade once per target timestep `i / 2^k`.
    Arbitrary,
    /// Split intervals at their midpoint, feeding synthesized frames back
    /// as interval endpoints.
    RecursiveHalving,
}

/// Produce the `2^k - 1` interior frames between `img0` and `img1`.
///
/// `infer` is one cascade invocation `(left, right, timestep) -> frame`.
/// Frames come back in strictly increasing timestep order; `factor_log2`
/// of zero yields no frames.
pub fn interpolate_sequence<B, F>(
    img0: &Tensor<B, 4>,
    img1: &Tensor<B, 4>,
    factor_log2: u32,
    mode: MultiFrameMode,
    mut infer: F,
) -> Result<Vec<Tensor<B, 4>>>
where
    B: Backend,
    F: FnMut(&Tensor<B, 4>, &Tensor<B, 4>, f32) -> Result<Tensor<B, 4>>,
{
    if factor_log2 == 0 {
        return Ok(Vec::new());
    }
    let steps = 1u32 << factor_log2;

    match mode {
        MultiFrameMode::Arbitrary => {
            let mut frames = Vec::with_capacity(steps as usize - 1);
            for i in 1..steps {
                let t = i as f32 / steps as f32;
                frames.push(infer(img0, img1, t)?);
            }
            Ok(frames)
        }
        MultiFrameMode::RecursiveHalving => {
            // Explicit worklist of (left, right, lo, hi) intervals keyed by
            // timestep numerators over `steps`; no call-stack growth for
            // large factors.
            let mut work: VecDeque<(Tensor<B, 4>, Tensor<B, 4>, u32, u32)> = VecDeque::new();
            work.push_back((img0.clone(), img1.clone(), 0, steps));

            let mut produced: Vec<(u32, Tensor<B, 4>)> = Vec::with_capacity(steps as usize - 1);
            while let Some((left, right, lo, hi)) = work.pop_front() {
                if hi - lo < 2 {
                    continue;
                }
                let mid = (lo + hi) / 2;
                let frame = infer(&left, &right, 0.5)?;
                produced.push((mid, frame.clone()));
                work.push_back((left, frame.clone(), lo, mid));
                work.push_back((frame, right, mid, hi));
            }

            produced.sort_by_key(|(numerator, _)| *numerator);
            Ok(produced.into_iter().map(|(_, frame)| frame).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_blend_respects_mask() {
        let device = Default::default();
        let a = Tensor::<B, 4>::ones([1, 3, 2, 2], &device);
        let b = Tensor::<B, 4>::zeros([1, 3, 2, 2], &device);

        // Strongly positive logits pick frame A, strongly negative frame B.
        let pick_a = blend(
            a.clone(),
            b.clone(),
            Tensor::ones([1, 1, 2, 2], &device).mul_scalar(50.0),
        );
        assert!((pick_a.mean().into_scalar() - 1.0).abs() < 1e-4);

        let pick_b = blend(a, b, Tensor::ones([1, 1, 2, 2], &device).mul_scalar(-50.0));
        assert!(pick_b.mean().into_scalar().abs() < 1e-4);
    }

    #[test]
    fn test_blend_clamps_output() {
        let device = Default::default();
        let hot = Tensor::<B, 4>::ones([1, 3, 2, 2], &device).mul_scalar(3.0);
        let cold = Tensor::<B, 4>::ones([1, 3, 2, 2], &device).mul_scalar(-1.0);
        let out = blend(hot, cold, Tensor::zeros([1, 1, 2, 2], &device));

        assert!(out.clone().max().into_scalar() <= 1.0);
        assert!(out.min().into_scalar() >= 0.0);
    }

    /// Interpolation stub: averages the endpoints by the timestep, and
    /// records the timesteps it was queried at.
    fn linear_stub(
        log: std::rc::Rc<std::cell::RefCell<Vec<f32>>>,
    ) -> impl FnMut(&Tensor<B, 4>, &Tensor<B, 4>, f32) -> Result<Tensor<B, 4>> {
        move |a, b, t| {
            log.borrow_mut().push(t);
            Ok(a.clone().mul_scalar(1.0 - t) + b.clone().mul_scalar(t))
        }
    }

    #[test]
    fn test_arbitrary_mode_counts_and_order() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 3, 4, 4], &device);
        let b = Tensor::<B, 4>::ones([1, 3, 4, 4], &device);

        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let frames =
            interpolate_sequence(&a, &b, 3, MultiFrameMode::Arbitrary, linear_stub(log.clone()))
                .unwrap();

        assert_eq!(frames.len(), 7);
        let timesteps = log.borrow().clone();
        let expected: Vec<f32> = (1..8).map(|i| i as f32 / 8.0).collect();
        assert_eq!(timesteps, expected);

        // With the linear stub, frame i must average to i/8.
        for (i, frame) in frames.iter().enumerate() {
            let mean = frame.clone().mean().into_scalar();
            assert!((mean - (i as f32 + 1.0) / 8.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_halving_mode_counts_and_order() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 3, 4, 4], &device);
        let b = Tensor::<B, 4>::ones([1, 3, 4, 4], &device);

        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let frames = interpolate_sequence(
            &a,
            &b,
            2,
            MultiFrameMode::RecursiveHalving,
            linear_stub(log.clone()),
        )
        .unwrap();

        assert_eq!(frames.len(), 3);
        // Every query is a midpoint query.
        assert!(log.borrow().iter().all(|&t| t == 0.5));

        // Results are ordered by timestep: 1/4, 1/2, 3/4 under the linear
        // stub.
        let means: Vec<f32> = frames
            .iter()
            .map(|f| f.clone().mean().into_scalar())
            .collect();
        assert!((means[0] - 0.25).abs() < 1e-5);
        assert!((means[1] - 0.5).abs() < 1e-5);
        assert!((means[2] - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_factor_zero_is_empty() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 3, 4, 4], &device);
        let frames = interpolate_sequence(
            &a,
            &a,
            0,
            MultiFrameMode::Arbitrary,
            |x, _, _| Ok(x.clone()),
        )
        .unwrap();
        assert!(frames.is_empty());
    }
}
