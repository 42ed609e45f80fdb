//! Training samples.

use burn::tensor::{backend::Backend, Tensor};

/// One training example: two source frames, the ground-truth intermediate
/// frame and its timestep.
///
/// Frame tensors are `[3, H, W]`, normalized to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct TripletSample<B: Backend> {
    pub img0: Tensor<B, 3>,
    pub gt: Tensor<B, 3>,
    pub img1: Tensor<B, 3>,
    pub timestep: f32,
}

impl<B: Backend> TripletSample<B> {
    pub fn dims(&self) -> [usize; 3] {
        self.img0.dims()
    }

    /// Apply one function to all three frames.
    pub fn map_frames(self, f: impl Fn(Tensor<B, 3>) -> Tensor<B, 3>) -> Self {
        Self {
            img0: f(self.img0),
            gt: f(self.gt),
            img1: f(self.img1),
            timestep: self.timestep,
        }
    }

    /// Swap temporal direction: sources exchange and the timestep mirrors.
    pub fn reverse_time(self) -> Self {
        Self {
            img0: self.img1,
            gt: self.gt,
            img1: self.img0,
            timestep: 1.0 - self.timestep,
        }
    }
}
