//! Vimeo-style frame triplet dataset.
//!
//! Each split entry names a sequence directory containing `im1.png`,
//! `im2.png` and `im3.png`; the middle frame is the ground truth at
//! t = 0.5. Training samples are cropped and augmented; evaluation samples
//! are returned untouched.

use std::path::PathBuf;

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use rand::thread_rng;
use tracing::warn;

use crate::augment;
use crate::decode::load_frame;
use crate::error::Result;
use crate::sample::TripletSample;
use crate::split::SplitList;

/// Dataset phase, controlling target selection and augmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
}

pub struct TripletDataset<B: Backend> {
    root: PathBuf,
    entries: Vec<String>,
    phase: Phase,
    crop: [usize; 2],
    augment: bool,
    device: B::Device,
}

impl<B: Backend> TripletDataset<B> {
    pub fn new(
        root: impl Into<PathBuf>,
        list: SplitList,
        phase: Phase,
        device: &B::Device,
    ) -> Self {
        Self {
            root: root.into(),
            entries: list.entries().to_vec(),
            phase,
            crop: [224, 224],
            augment: true,
            device: device.clone(),
        }
    }

    /// Override the training crop size.
    pub fn with_crop(mut self, crop: [usize; 2]) -> Self {
        self.crop = crop;
        self
    }

    /// Disable the coin-flip augmentations (the crop still applies).
    pub fn without_augmentation(mut self) -> Self {
        self.augment = false;
        self
    }

    fn load(&self, index: usize) -> Result<TripletSample<B>> {
        let dir = self.root.join(&self.entries[index]);
        let img0 = load_frame::<B>(&dir.join("im1.png"), &self.device)?;
        let gt = load_frame::<B>(&dir.join("im2.png"), &self.device)?;
        let img1 = load_frame::<B>(&dir.join("im3.png"), &self.device)?;

        let mut sample = TripletSample {
            img0: img0.into_tensor(),
            gt: gt.into_tensor(),
            img1: img1.into_tensor(),
            timestep: 0.5,
        };

        if self.phase == Phase::Train {
            let mut rng = thread_rng();
            sample = if self.augment {
                augment::augment(sample, self.crop, &mut rng)
            } else {
                augment::random_crop(sample, self.crop[0], self.crop[1], &mut rng)
            };
        }
        Ok(sample)
    }
}

impl<B: Backend> Dataset<TripletSample<B>> for TripletDataset<B> {
    /// Per-sample failures are logged and skipped, never fatal to the
    /// surrounding batch.
    fn get(&self, index: usize) -> Option<TripletSample<B>> {
        if index >= self.entries.len() {
            return None;
        }
        match self.load(index) {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!(index, entry = %self.entries[index], %err, "skipping sample");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
