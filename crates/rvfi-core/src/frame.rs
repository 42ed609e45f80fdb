use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::RgbImage;

/// A single video frame.
///
/// Pixel data is a `[3, H, W]` float tensor with values normalized to
/// `[0, 1]`, channel order RGB. Frames are created fresh per call; nothing
/// is cached across inference calls.
#[derive(Debug, Clone)]
pub struct Frame<B: Backend> {
    data: Tensor<B, 3>,
}

impl<B: Backend> Frame<B> {
    /// Wrap an existing `[3, H, W]` tensor.
    ///
    /// # Panics
    /// Panics if the channel dimension is not 3.
    pub fn new(data: Tensor<B, 3>) -> Self {
        let [c, _, _] = data.dims();
        assert_eq!(c, 3, "frames are 3-channel RGB, got {c} channels");
        Self { data }
    }

    /// Build a frame from an 8-bit RGB buffer in row-major HWC order.
    pub fn from_rgb8(width: u32, height: u32, pixels: &[u8], device: &B::Device) -> Self {
        let (w, h) = (width as usize, height as usize);
        assert_eq!(pixels.len(), w * h * 3, "pixel buffer does not match {w}x{h} RGB");
        let floats: Vec<f32> = pixels.iter().map(|&v| v as f32 / 255.0).collect();
        let hwc = Tensor::<B, 3>::from_data(TensorData::new(floats, [h, w, 3]), device);
        Self {
            data: hwc.permute([2, 0, 1]),
        }
    }

    /// Build a frame from a decoded image.
    pub fn from_image(img: &RgbImage, device: &B::Device) -> Self {
        Self::from_rgb8(img.width(), img.height(), img.as_raw(), device)
    }

    /// Quantize back to an 8-bit RGB buffer, clamping to the valid range.
    pub fn to_rgb8(&self) -> (u32, u32, Vec<u8>) {
        let [_, h, w] = self.data.dims();
        let hwc = self.data.clone().clamp(0.0, 1.0).permute([1, 2, 0]);
        let values = hwc
            .into_data()
            .to_vec::<f32>()
            .expect("frame data is f32");
        let bytes = values.iter().map(|v| (v * 255.0).round() as u8).collect();
        (w as u32, h as u32, bytes)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.data.dims()
    }

    pub fn height(&self) -> usize {
        self.data.dims()[1]
    }

    pub fn width(&self) -> usize {
        self.data.dims()[2]
    }

    pub fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    pub fn into_tensor(self) -> Tensor<B, 3> {
        self.data
    }

    /// Lift to a single-element batch `[1, 3, H, W]`.
    pub fn to_batch(&self) -> Tensor<B, 4> {
        self.data.clone().unsqueeze::<4>()
    }

    /// Stack frames of identical size into a `[N, 3, H, W]` batch.
    ///
    /// # Panics
    /// Panics on an empty slice or mismatched frame sizes; callers are
    /// expected to have cropped/validated beforehand.
    pub fn batch(frames: &[Frame<B>]) -> Tensor<B, 4> {
        assert!(!frames.is_empty(), "cannot batch zero frames");
        let dims = frames[0].dims();
        for frame in frames {
            assert_eq!(frame.dims(), dims, "all frames in a batch must share one size");
        }
        Tensor::stack::<4>(frames.iter().map(|f| f.data.clone()).collect(), 0)
    }
}
