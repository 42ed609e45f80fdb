//! Multi-scale flow estimation.
//!
//! # Module Structure
//!
//! ```text
//! flownet/
//! ├── schedule/  - Scale schedules (per-stage downsampling factors)
//! ├── block/     - One refinement stage (residual conv network)
//! └── cascade/   - The coarse-to-fine cascade over all stages
//! ```

pub mod block;
pub mod cascade;
pub mod schedule;

pub use block::{CascadeStage, CascadeStageConfig, FLOW_CHANNELS, STAGE_COND_CHANNELS};
pub use cascade::{CascadeOutput, FlowCascade, FlowCascadeConfig};
pub use schedule::ScaleSchedule;
