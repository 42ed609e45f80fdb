use std::path::PathBuf;

use anyhow::Context;
use burn::tensor::backend::Backend;
use clap::Parser;
use tracing::info;

use rvfi_bench::{run_benchmark, BenchmarkConfig, NullPerceptual};
use rvfi_model::{FlowCascadeConfig, Model, MultiFrameMode};

#[derive(Parser)]
#[command(name = "benchmark")]
#[command(about = "Run the interpolation benchmark over held-out clips")]
struct Args {
    /// Directory containing clip_<n> frame directories
    #[arg(long)]
    data_root: PathBuf,

    /// Model checkpoint (safetensors)
    #[arg(long)]
    checkpoint: PathBuf,

    /// First clip number (inclusive)
    #[arg(long, default_value_t = 7235)]
    clip_start: usize,

    /// Last clip number (inclusive)
    #[arg(long, default_value_t = 7443)]
    clip_end: usize,

    /// Interpolate 2^k - 1 frames per window
    #[arg(long, default_value_t = 4)]
    factor_log2: u32,

    /// Symmetric vertical padding rows applied around inference
    #[arg(long, default_value_t = 24)]
    pad_rows: usize,

    /// Use recursive midpoint halving instead of direct timestep queries
    #[arg(long)]
    halving: bool,

    /// Compute device: cpu or gpu
    #[arg(long, default_value = "cpu")]
    device: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    match args.device.as_str() {
        "cpu" => run::<burn_ndarray::NdArray<f32>>(&args, Default::default()),
        "gpu" => run::<burn::backend::wgpu::Wgpu>(
            &args,
            burn::backend::wgpu::WgpuDevice::default(),
        ),
        other => anyhow::bail!("unknown device {other:?}, expected cpu or gpu"),
    }
}

fn run<B: Backend>(args: &Args, device: B::Device) -> anyhow::Result<()> {
    let mut model = Model::<B>::new(&FlowCascadeConfig::new(), &device);
    // A missing checkpoint is fatal at startup; benchmarking an untrained
    // model is never what anyone wants.
    model
        .load_checkpoint(&args.checkpoint)
        .with_context(|| format!("loading checkpoint {}", args.checkpoint.display()))?;

    let mut config = BenchmarkConfig::new(&args.data_root, args.clip_start, args.clip_end);
    config.factor_log2 = args.factor_log2;
    config.pad_rows = args.pad_rows;
    config.mode = if args.halving {
        MultiFrameMode::RecursiveHalving
    } else {
        MultiFrameMode::Arbitrary
    };

    info!(
        clips = config.clip_end - config.clip_start + 1,
        factor = 1 << config.factor_log2,
        "starting benchmark"
    );
    let report = run_benchmark(&model, &config, &NullPerceptual)?;

    for clip in &report.clips {
        println!(
            "clip {:>6}: {:>4} frames  PSNR {:6.2}  perceptual {:.4}",
            clip.clip, clip.frames, clip.mean_psnr, clip.mean_perceptual
        );
    }
    println!();
    println!(
        "Overall mean PSNR across {} clips: {:.2}",
        report.clips.len(),
        report.overall_psnr
    );
    println!(
        "Overall mean perceptual distance: {:.4}",
        report.overall_perceptual
    );
    Ok(())
}
