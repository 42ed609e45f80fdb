//! Multi-scale video frame interpolation.
//!
//! Given two frames of a video, the model predicts intermediate frames at
//! arbitrary timesteps: a coarse-to-fine cascade refines a bidirectional
//! flow field and a blend mask, the sources are warped toward the target
//! instant, and a mask-weighted blend produces the output frame.

pub mod checkpoint;
pub mod error;
pub mod flownet;
pub mod losses;
pub mod model;
pub mod synthesis;
pub mod validation;

pub use error::{ModelError, Result};
pub use flownet::{CascadeOutput, FlowCascade, FlowCascadeConfig, ScaleSchedule};
pub use losses::{
    FeatureExtractor, HeatmapLoss, KeypointEstimator, LossBreakdown, LossWeights,
    PerceptualLoss, PhotometricLoss, SobelSmoothnessLoss,
};
pub use model::{Model, Trainer};
pub use synthesis::MultiFrameMode;
