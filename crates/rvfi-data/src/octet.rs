//! Octet dataset: endpoints eight frames apart.
//!
//! Split entries are individual frame paths grouped in blocks of nine
//! consecutive frames. A sample takes the block's first and last frames as
//! sources and one interior frame as ground truth at t = target/8.
//! Training draws the target uniformly from 1..=7; evaluation enumerates
//! all seven targets per block.

use std::path::PathBuf;

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use rand::{thread_rng, Rng};
use tracing::warn;

use crate::augment;
use crate::decode::load_frame;
use crate::error::Result;
use crate::sample::TripletSample;
use crate::split::SplitList;
use crate::triplet::Phase;

/// Frames per block: two endpoints and seven interior targets.
const GROUP: usize = 9;
/// Interpolation factor between the endpoints.
const INTERP_FACTOR: usize = 8;

pub struct OctetDataset<B: Backend> {
    root: PathBuf,
    entries: Vec<String>,
    phase: Phase,
    crop: [usize; 2],
    augment: bool,
    device: B::Device,
}

impl<B: Backend> OctetDataset<B> {
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
            crop: [640, 640],
            augment: true,
            device: device.clone(),
        }
    }

    pub fn with_crop(mut self, crop: [usize; 2]) -> Self {
        self.crop = crop;
        self
    }

    pub fn without_augmentation(mut self) -> Self {
        self.augment = false;
        self
    }

    fn groups(&self) -> usize {
        self.entries.len() / GROUP
    }

    fn load(&self, index: usize) -> Result<TripletSample<B>> {
        let (group, target) = match self.phase {
            Phase::Train => (index, thread_rng().gen_range(1..INTERP_FACTOR)),
            Phase::Eval => (index / (GROUP - 2), index % (GROUP - 2) + 1),
        };
        let base = group * GROUP;

        let img0 = load_frame::<B>(&self.root.join(&self.entries[base]), &self.device)?;
        let gt = load_frame::<B>(&self.root.join(&self.entries[base + target]), &self.device)?;
        let img1 = load_frame::<B>(
            &self.root.join(&self.entries[base + INTERP_FACTOR]),
            &self.device,
        )?;

        let sample = TripletSample {
            img0: img0.into_tensor(),
            gt: gt.into_tensor(),
            img1: img1.into_tensor(),
            timestep: target as f32 / INTERP_FACTOR as f32,
        };

        let mut rng = thread_rng();
        let sample = augment::random_crop(sample, self.crop[0], self.crop[1], &mut rng);
        Ok(if self.phase == Phase::Train && self.augment {
            augment::random_rotation(augment::random_flips(sample, &mut rng), &mut rng)
        } else {
            sample
        })
    }
}

impl<B: Backend> Dataset<TripletSample<B>> for OctetDataset<B> {
    /// Per-sample failures are logged and skipped, never fatal to the
    /// surrounding batch.
    fn get(&self, index: usize) -> Option<TripletSample<B>> {
        if index >= self.len() {
            return None;
        }
        match self.load(index) {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!(index, %err, "skipping sample");
                None
            }
        }
    }

    fn len(&self) -> usize {
        match self.phase {
            Phase::Train => self.groups(),
            Phase::Eval => (GROUP - 2) * self.groups(),
        }
    }
}
