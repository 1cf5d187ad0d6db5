//! Adaptive in-car volume control.
//!
//! [`VolumeEngine`] derives a target level from speed, cabin noise, gear,
//! horn, navigation prompts and drive mode (or takes it straight from the
//! user under manual control), holds the level down for a short window after
//! the horn, and eases the audible level toward the target.

pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod ducking;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod scenario;
pub mod smoothing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VolumeConfig;
pub use context::{ContextSnapshot, ControlPolicy, DriveMode, VolumeInputs};
pub use engine::{LevelReport, VolumeEngine};
pub use error::LoadError;
pub use events::{NoopObserver, RecordingObserver, TracingObserver, VolumeEvent, VolumeObserver};
pub use smoothing::{ConvergenceStrategy, SmoothingConfig};
