pub mod color;
pub mod frame;
pub mod pad;
pub mod resize;
pub mod warp;

pub use frame::Frame;
pub use pad::Alignment;
pub use warp::{backward_warp, bilinear_sample};
