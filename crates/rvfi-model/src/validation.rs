//! Fail-fast input validation.
//!
//! All shape and range checks run before any tensor reaches the cascade,
//! so malformed calls abort with a typed error instead of a backend panic
//! deep inside a convolution.

use burn::tensor::{backend::Backend, Tensor};

use crate::error::{ModelError, Result};

/// Validate that a frame pair is well formed for the cascade: identical
/// shapes, three channels each.
pub fn validate_frame_pair<B: Backend>(
    img0: &Tensor<B, 4>,
    img1: &Tensor<B, 4>,
) -> Result<()> {
    let d0 = img0.dims();
    let d1 = img1.dims();
    if d0 != d1 {
        return Err(ModelError::ShapeMismatch {
            expected: d0.to_vec(),
            actual: d1.to_vec(),
        });
    }
    if d0[1] != 3 {
        return Err(ModelError::ShapeMismatch {
            expected: vec![d0[0], 3, d0[2], d0[3]],
            actual: d0.to_vec(),
        });
    }
    Ok(())
}

/// Validate that spatial dimensions divide the alignment stride.
pub fn validate_alignment(dims: [usize; 4], stride: usize) -> Result<()> {
    let [_, _, h, w] = dims;
    if h % stride != 0 || w % stride != 0 {
        return Err(ModelError::ShapeMismatch {
            expected: vec![
                dims[0],
                dims[1],
                h.div_ceil(stride) * stride,
                w.div_ceil(stride) * stride,
            ],
            actual: dims.to_vec(),
        });
    }
    Ok(())
}

/// Timesteps denote a position between the two inputs; extrapolation is
/// refused rather than silently attempted.
pub fn validate_timestep(t: f32) -> Result<()> {
    if !t.is_finite() || !(0.0..=1.0).contains(&t) {
        return Err(ModelError::invalid_timestep(format!(
            "timestep must lie in [0, 1], got {t}"
        )));
    }
    Ok(())
}
