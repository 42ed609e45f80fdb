//! Dataset plumbing: frame extraction and split generation.
//!
//! Video decoding is delegated to an external `ffmpeg` subprocess; this
//! project never parses containers itself.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Decompose a video into numbered PNG frames under `output`.
pub fn extract_frames(video: &Path, output: &Path, fps: Option<f64>) -> Result<()> {
    if !video.is_file() {
        bail!("video file {} does not exist", video.display());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let mut command = Command::new("ffmpeg");
    command.arg("-i").arg(video);
    if let Some(fps) = fps {
        command.arg("-vf").arg(format!("fps={fps}"));
    }
    command
        .arg("-vsync")
        .arg("0")
        .arg(output.join("%06d.png"));

    info!(video = %video.display(), output = %output.display(), "running ffmpeg");
    let status = command
        .status()
        .context("launching ffmpeg; is it installed and on PATH?")?;
    if !status.success() {
        bail!("ffmpeg exited with {status}");
    }

    let count = fs::read_dir(output)?.count();
    info!(frames = count, "extraction finished");
    Ok(())
}

/// Scan `frames_root` and write train/test split lists of frame paths.
///
/// Clips are assigned to splits as whole units so no clip straddles the
/// boundary; within a clip, frames are listed in sorted order relative to
/// `frames_root`.
pub fn make_splits(frames_root: &Path, output: &Path, train_fraction: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&train_fraction) {
        bail!("train fraction must lie in [0, 1], got {train_fraction}");
    }
    let clips = sorted_clip_dirs(frames_root)?;
    if clips.is_empty() {
        bail!("no clip directories under {}", frames_root.display());
    }

    let cut = ((clips.len() as f64) * train_fraction) as usize;
    fs::create_dir_all(output)?;

    for (name, range) in [("vfi_train.txt", 0..cut), ("vfi_test.txt", cut..clips.len())] {
        let mut lines = Vec::new();
        for clip in &clips[range] {
            for frame in sorted_files(clip)? {
                let relative = frame
                    .strip_prefix(frames_root)
                    .expect("frame lies under the frames root");
                lines.push(relative.display().to_string());
            }
        }
        let path = output.join(name);
        fs::write(&path, lines.join("\n") + "\n")
            .with_context(|| format!("writing {}", path.display()))?;
        info!(list = %path.display(), entries = lines.len(), "wrote split");
    }
    Ok(())
}

/// Report clips whose frame counts cannot form complete sample groups.
pub fn verify_dataset(frames_root: &Path, group: usize) -> Result<()> {
    let clips = sorted_clip_dirs(frames_root)?;
    if clips.is_empty() {
        bail!("no clip directories under {}", frames_root.display());
    }

    let mut incomplete = 0usize;
    for clip in &clips {
        let frames = sorted_files(clip)?.len();
        if frames < group {
            warn!(clip = %clip.display(), frames, "fewer frames than one group");
            incomplete += 1;
        } else if frames % group != 0 {
            warn!(
                clip = %clip.display(),
                frames,
                remainder = frames % group,
                "trailing frames do not fill a group"
            );
        }
    }
    info!(
        clips = clips.len(),
        incomplete, "dataset verification finished"
    );
    Ok(())
}

fn sorted_clip_dirs(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs: Vec<_> = fs::read_dir(root)
        .with_context(|| format!("reading {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn sorted_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}
