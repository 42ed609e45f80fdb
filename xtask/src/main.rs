use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod frames;

use frames::{extract_frames, make_splits, verify_dataset};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for the rvfi project")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract per-frame PNGs from a video via ffmpeg
    ExtractFrames {
        /// Input video file
        video: PathBuf,

        /// Output directory for the clip's frames
        #[arg(short, long, default_value = "frames")]
        output: PathBuf,

        /// Optional frame rate override passed to ffmpeg
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Write train/test split lists from a frames root
    MakeSplits {
        /// Directory containing clip subdirectories
        frames_root: PathBuf,

        /// Directory receiving vfi_train.txt / vfi_test.txt
        #[arg(short, long, default_value = "splits")]
        output: PathBuf,

        /// Fraction of clips assigned to the training split
        #[arg(long, default_value_t = 0.95)]
        train_fraction: f64,
    },

    /// Check clip directories for frame-count completeness
    VerifyDataset {
        /// Directory containing clip subdirectories
        frames_root: PathBuf,

        /// Frames per sample group
        #[arg(long, default_value_t = 9)]
        group: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    match cli.command {
        Commands::ExtractFrames { video, output, fps } => extract_frames(&video, &output, fps),
        Commands::MakeSplits {
            frames_root,
            output,
            train_fraction,
        } => make_splits(&frames_root, &output, train_fraction),
        Commands::VerifyDataset { frames_root, group } => verify_dataset(&frames_root, group),
    }
}
