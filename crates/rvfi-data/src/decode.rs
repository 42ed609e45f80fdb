//! Frame decoding.

use std::path::Path;

use burn::tensor::backend::Backend;
use image::ImageError;

use rvfi_core::Frame;

use crate::error::{DataError, Result};

/// Decode a still-image file into a normalized [`Frame`].
///
/// A file that cannot be opened reports [`DataError::MissingResource`]; one
/// that opens but fails to decode reports [`DataError::CorruptFrame`].
pub fn load_frame<B: Backend>(path: &Path, device: &B::Device) -> Result<Frame<B>> {
    let img = image::open(path).map_err(|err| match err {
        ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            DataError::missing_resource(format!("frame {}", path.display()))
        }
        other => DataError::corrupt_frame(path, other.to_string()),
    })?;
    Ok(Frame::from_image(&img.to_rgb8(), device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::RgbImage;

    type B = NdArray<f32>;

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let img = RgbImage::from_fn(8, 6, |x, y| image::Rgb([x as u8, y as u8, 0]));
        img.save(&path).unwrap();

        let device = Default::default();
        let frame = load_frame::<B>(&path, &device).unwrap();
        assert_eq!(frame.dims(), [3, 6, 8]);
    }

    #[test]
    fn test_missing_file() {
        let device = Default::default();
        let err = load_frame::<B>(Path::new("/nonexistent/frame.png"), &device).unwrap_err();
        assert!(matches!(err, DataError::MissingResource(_)));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"this is not a png").unwrap();

        let device = Default::default();
        let err = load_frame::<B>(&path, &device).unwrap_err();
        assert!(matches!(err, DataError::CorruptFrame { .. }));
    }
}
