//! Training-time augmentation.
//!
//! The standard recipe: a random fixed-size crop, then coin-flip channel
//! reversal, vertical flip, horizontal flip, temporal reversal and a random
//! quarter-turn rotation. All three frames of a sample receive identical
//! treatment so the triplet stays consistent.

use burn::tensor::{backend::Backend, Tensor};
use rand::Rng;

use crate::sample::TripletSample;

/// Crop all frames of a sample to `h` x `w` at one random position.
pub fn random_crop<B: Backend, R: Rng>(
    sample: TripletSample<B>,
    h: usize,
    w: usize,
    rng: &mut R,
) -> TripletSample<B> {
    let [_, ih, iw] = sample.dims();
    assert!(ih >= h && iw >= w, "crop {h}x{w} exceeds frame {ih}x{iw}");
    let y = rng.gen_range(0..=ih - h);
    let x = rng.gen_range(0..=iw - w);
    sample.map_frames(|frame| frame.slice([0..3, y..y + h, x..x + w]))
}

/// Coin-flip augmentations applied with probability 1/2 each.
pub fn random_flips<B: Backend, R: Rng>(
    sample: TripletSample<B>,
    rng: &mut R,
) -> TripletSample<B> {
    let mut sample = sample;
    if rng.gen::<f32>() < 0.5 {
        // Channel reversal (RGB -> BGR).
        sample = sample.map_frames(|frame| frame.flip([0]));
    }
    if rng.gen::<f32>() < 0.5 {
        // Vertical flip.
        sample = sample.map_frames(|frame| frame.flip([1]));
    }
    if rng.gen::<f32>() < 0.5 {
        // Horizontal flip.
        sample = sample.map_frames(|frame| frame.flip([2]));
    }
    if rng.gen::<f32>() < 0.5 {
        sample = sample.reverse_time();
    }
    sample
}

/// Rotate all frames by a random number of quarter turns.
pub fn random_rotation<B: Backend, R: Rng>(
    sample: TripletSample<B>,
    rng: &mut R,
) -> TripletSample<B> {
    let turns = rng.gen_range(0..4);
    if turns == 0 {
        return sample;
    }
    sample.map_frames(|frame| {
        let mut frame = frame;
        for _ in 0..turns {
            frame = quarter_turn(frame);
        }
        frame
    })
}

/// One 90-degree rotation: transpose the spatial axes, then flip rows.
fn quarter_turn<B: Backend>(frame: Tensor<B, 3>) -> Tensor<B, 3> {
    frame.swap_dims(1, 2).flip([1])
}

/// The full training augmentation pipeline.
pub fn augment<B: Backend, R: Rng>(
    sample: TripletSample<B>,
    crop: [usize; 2],
    rng: &mut R,
) -> TripletSample<B> {
    let sample = random_crop(sample, crop[0], crop[1], rng);
    let sample = random_flips(sample, rng);
    random_rotation(sample, rng)
}
