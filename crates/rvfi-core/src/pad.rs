use burn::tensor::{backend::Backend, Tensor};

/// Replicate-edge padding applied before the cascade and stripped after.
///
/// The cascade needs spatial dimensions divisible by its alignment stride;
/// inputs are padded to satisfy that and the padding is stripped from the
/// output, so callers always get frames at the size they passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alignment {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Alignment {
    /// No padding.
    pub fn none() -> Self {
        Self::default()
    }

    /// Padding (bottom/right only) that makes `h` x `w` divisible by `stride`.
    pub fn for_size(h: usize, w: usize, stride: usize) -> Self {
        let ph = h.div_ceil(stride) * stride;
        let pw = w.div_ceil(stride) * stride;
        Self {
            top: 0,
            bottom: ph - h,
            left: 0,
            right: pw - w,
        }
    }

    /// Symmetric vertical padding, as used by the benchmark driver on 720p
    /// clips.
    pub fn vertical(rows: usize) -> Self {
        Self {
            top: rows,
            bottom: rows,
            left: 0,
            right: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }

    /// Pad a `[N, C, H, W]` batch by replicating edge rows/columns.
    ///
    /// Built from edge slices and concatenation so gradients flow through
    /// unchanged.
    pub fn apply<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.is_none() {
            return x;
        }
        let mut out = x;
        if self.top > 0 {
            let [n, c, _h, w] = out.dims();
            let edge = out
                .clone()
                .slice([0..n, 0..c, 0..1, 0..w])
                .repeat(&[1, 1, self.top, 1]);
            out = Tensor::cat(vec![edge, out], 2);
        }
        if self.bottom > 0 {
            let [n, c, h, w] = out.dims();
            let edge = out
                .clone()
                .slice([0..n, 0..c, h - 1..h, 0..w])
                .repeat(&[1, 1, self.bottom, 1]);
            out = Tensor::cat(vec![out, edge], 2);
        }
        if self.left > 0 {
            let [n, c, h, w] = out.dims();
            let edge = out
                .clone()
                .slice([0..n, 0..c, 0..h, 0..1])
                .repeat(&[1, 1, 1, self.left]);
            out = Tensor::cat(vec![edge, out], 3);
        }
        if self.right > 0 {
            let [n, c, h, w] = out.dims();
            let edge = out
                .clone()
                .slice([0..n, 0..c, 0..h, w - 1..w])
                .repeat(&[1, 1, 1, self.right]);
            out = Tensor::cat(vec![out, edge], 3);
        }
        out
    }

    /// Remove exactly the padding applied by [`Alignment::apply`].
    pub fn strip<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.is_none() {
            return x;
        }
        let [n, c, h, w] = x.dims();
        x.slice([
            0..n,
            0..c,
            self.top..h - self.bottom,
            self.left..w - self.right,
        ])
    }
}
