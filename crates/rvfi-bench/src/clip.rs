//! Clip enumeration and frame-window loading.
//!
//! A clip is a directory of extracted frame images; its sorted file listing
//! is the frame order. Benchmark windows take `2^k + 1` consecutive frames:
//! the endpoints feed the model and the interior frames are ground truth.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use burn::tensor::{backend::Backend, Tensor};

use rvfi_data::decode::load_frame;

/// One benchmark window.
pub struct ClipWindow<B: Backend> {
    /// First endpoint `[1, 3, H, W]`.
    pub img0: Tensor<B, 4>,
    /// Second endpoint `[1, 3, H, W]`.
    pub img1: Tensor<B, 4>,
    /// Interior ground-truth frames in temporal order.
    pub ground_truth: Vec<Tensor<B, 4>>,
}

/// Sorted frame files of a clip directory.
pub fn list_frames(clip_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(clip_dir)
        .with_context(|| format!("reading clip directory {}", clip_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    frames.sort();
    Ok(frames)
}

/// Load the window starting at `start` spanning `steps` frame intervals.
pub fn load_window<B: Backend>(
    frames: &[PathBuf],
    start: usize,
    steps: usize,
    device: &B::Device,
) -> anyhow::Result<ClipWindow<B>> {
    ensure!(
        start + steps < frames.len(),
        "window [{start}, {}] exceeds the {} available frames",
        start + steps,
        frames.len()
    );

    let img0 = load_frame::<B>(&frames[start], device)?.to_batch();
    let img1 = load_frame::<B>(&frames[start + steps], device)?.to_batch();

    let mut ground_truth = Vec::with_capacity(steps - 1);
    for offset in 1..steps {
        ground_truth.push(load_frame::<B>(&frames[start + offset], device)?.to_batch());
    }

    Ok(ClipWindow {
        img0,
        img1,
        ground_truth,
    })
}
