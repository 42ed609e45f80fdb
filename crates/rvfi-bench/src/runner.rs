//! Benchmark orchestration over held-out clips.
//!
//! Missing clips and failed windows are logged and skipped; the run
//! continues with whatever remains. The summary reports a mean per clip
//! and the overall mean over those per-clip means.

use std::path::PathBuf;

use anyhow::bail;
use burn::tensor::backend::Backend;
use tracing::{info, warn};

use rvfi_core::pad::Alignment;
use rvfi_model::{Model, MultiFrameMode};

use crate::clip::{self, ClipWindow};
use crate::perceptual::PerceptualMetric;
use crate::psnr::luma_psnr;

/// Benchmark settings.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Directory containing `clip_<n>` subdirectories of extracted frames.
    pub data_root: PathBuf,
    /// First clip number, inclusive.
    pub clip_start: usize,
    /// Last clip number, inclusive.
    pub clip_end: usize,
    /// Interpolate `2^k - 1` frames per window.
    pub factor_log2: u32,
    /// Symmetric vertical replicate padding applied around inference.
    pub pad_rows: usize,
    /// Multi-frame generation strategy.
    pub mode: MultiFrameMode,
}

impl BenchmarkConfig {
    pub fn new(data_root: impl Into<PathBuf>, clip_start: usize, clip_end: usize) -> Self {
        Self {
            data_root: data_root.into(),
            clip_start,
            clip_end,
            factor_log2: 4,
            pad_rows: 24,
            mode: MultiFrameMode::Arbitrary,
        }
    }
}

/// Per-clip metric means.
#[derive(Debug, Clone)]
pub struct ClipReport {
    pub clip: usize,
    pub frames: usize,
    pub mean_psnr: f64,
    pub mean_perceptual: f64,
}

/// Whole-run summary.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub clips: Vec<ClipReport>,
    pub overall_psnr: f64,
    pub overall_perceptual: f64,
}

/// Run the benchmark over the configured clip range.
pub fn run_benchmark<B: Backend, P: PerceptualMetric<B>>(
    model: &Model<B>,
    config: &BenchmarkConfig,
    perceptual: &P,
) -> anyhow::Result<BenchmarkReport> {
    let mut clips = Vec::new();

    for clip_number in config.clip_start..=config.clip_end {
        let clip_dir = config.data_root.join(format!("clip_{clip_number}"));
        if !clip_dir.is_dir() {
            warn!(clip = clip_number, path = %clip_dir.display(), "skipping missing clip");
            continue;
        }

        match benchmark_clip(model, clip_number, &clip_dir, config, perceptual) {
            Ok(Some(report)) => {
                info!(
                    clip = clip_number,
                    frames = report.frames,
                    psnr = report.mean_psnr,
                    perceptual = report.mean_perceptual,
                    "clip finished"
                );
                clips.push(report);
            }
            Ok(None) => warn!(clip = clip_number, "clip produced no complete windows"),
            Err(err) => warn!(clip = clip_number, %err, "skipping failed clip"),
        }
    }

    if clips.is_empty() {
        bail!("no valid results obtained");
    }

    let overall_psnr = clips.iter().map(|c| c.mean_psnr).sum::<f64>() / clips.len() as f64;
    let overall_perceptual =
        clips.iter().map(|c| c.mean_perceptual).sum::<f64>() / clips.len() as f64;

    Ok(BenchmarkReport {
        clips,
        overall_psnr,
        overall_perceptual,
    })
}

fn benchmark_clip<B: Backend, P: PerceptualMetric<B>>(
    model: &Model<B>,
    clip_number: usize,
    clip_dir: &std::path::Path,
    config: &BenchmarkConfig,
    perceptual: &P,
) -> anyhow::Result<Option<ClipReport>> {
    let frames = clip::list_frames(clip_dir)?;
    let steps = 1usize << config.factor_log2;
    let pad = Alignment::vertical(config.pad_rows);

    let mut psnr_values = Vec::new();
    let mut perceptual_values = Vec::new();

    let mut start = 0;
    while start + steps < frames.len() {
        let window: ClipWindow<B> =
            match clip::load_window(&frames, start, steps, model.device()) {
                Ok(window) => window,
                Err(err) => {
                    warn!(clip = clip_number, start, %err, "skipping window");
                    start += steps;
                    continue;
                }
            };

        let img0 = pad.apply(window.img0);
        let img1 = pad.apply(window.img1);
        let predictions =
            match model.interpolate_multi(&img0, &img1, config.factor_log2, config.mode) {
                Ok(predictions) => predictions,
                Err(err) => {
                    warn!(clip = clip_number, start, %err, "skipping window");
                    start += steps;
                    continue;
                }
            };

        for (prediction, ground_truth) in predictions.iter().zip(&window.ground_truth) {
            let prediction = pad.strip(prediction.clone());
            psnr_values.push(luma_psnr(&prediction, ground_truth));
            perceptual_values.push(perceptual.distance(&prediction, ground_truth));
        }
        start += steps;
    }

    if psnr_values.is_empty() {
        return Ok(None);
    }

    let frames_scored = psnr_values.len();
    Ok(Some(ClipReport {
        clip: clip_number,
        frames: frames_scored,
        mean_psnr: psnr_values.iter().sum::<f64>() / frames_scored as f64,
        mean_perceptual: perceptual_values.iter().sum::<f64>() / frames_scored as f64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perceptual::NullPerceptual;
    use burn_ndarray::NdArray;
    use image::RgbImage;
    use rvfi_model::FlowCascadeConfig;

    type B = NdArray<f32>;

    fn write_clip(root: &std::path::Path, number: usize, frames: usize) {
        let dir = root.join(format!("clip_{number}"));
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..frames {
            let img = RgbImage::from_fn(32, 32, |x, y| {
                image::Rgb([((x + y) % 256) as u8, 64, (i % 256) as u8])
            });
            img.save(dir.join(format!("{i:06}.png"))).unwrap();
        }
    }

    fn test_config(root: &std::path::Path, start: usize, end: usize) -> BenchmarkConfig {
        let mut config = BenchmarkConfig::new(root, start, end);
        config.factor_log2 = 1;
        config.pad_rows = 0;
        config
    }

    fn tiny_model() -> Model<B> {
        let device = Default::default();
        Model::new(
            &FlowCascadeConfig {
                stage_channels: vec![16, 16, 8, 8],
                stage_depth: 1,
                alignment: 32,
            },
            &device,
        )
    }

    #[test]
    fn test_missing_clips_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 1, 5);
        // Clip 2 does not exist; clip 3 does.
        write_clip(dir.path(), 3, 5);

        let model = tiny_model();
        let report =
            run_benchmark(&model, &test_config(dir.path(), 1, 3), &NullPerceptual).unwrap();
        let scored: Vec<usize> = report.clips.iter().map(|c| c.clip).collect();
        assert_eq!(scored, vec![1, 3]);
    }

    #[test]
    fn test_no_clips_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = tiny_model();
        assert!(run_benchmark(&model, &test_config(dir.path(), 1, 2), &NullPerceptual).is_err());
    }

    #[test]
    fn test_report_aggregates_over_clip_means() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 1, 5);
        write_clip(dir.path(), 2, 5);

        let model = tiny_model();
        let report =
            run_benchmark(&model, &test_config(dir.path(), 1, 2), &NullPerceptual).unwrap();

        assert_eq!(report.clips.len(), 2);
        let expected =
            report.clips.iter().map(|c| c.mean_psnr).sum::<f64>() / report.clips.len() as f64;
        assert!((report.overall_psnr - expected).abs() < 1e-12);
        assert_eq!(report.overall_perceptual, 0.0);
    }

    #[test]
    fn test_window_counts() {
        let dir = tempfile::tempdir().unwrap();
        // Five frames at factor 1: windows at 0 and 2, one interior frame
        // each.
        write_clip(dir.path(), 1, 5);

        let model = tiny_model();
        let report =
            run_benchmark(&model, &test_config(dir.path(), 1, 1), &NullPerceptual).unwrap();
        assert_eq!(report.clips[0].frames, 2);
    }
}
