//! Informational events raised while the engine evaluates its rules.
//!
//! Observers only watch; nothing they do feeds back into the decision logic.

use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VolumeEvent {
    HornPressed,
    HornReleased,
    DuckingExpired,
    /// Horn attenuation was applied to this update's target.
    HornDuckApplied,
    NavigationSpeaking,
    ReverseGear,
    SuddenBrake { drop_kmh: i64 },
    SpeedDecrease { drop_kmh: i64 },
    ManualOverride { requested: i32, applied: f32 },
    TargetRecomputed { previous: f32, target: f32 },
    /// Convergence hit its step cap before closing the gap.
    ConvergenceCapped { steps: u32, gap: f32 },
}

pub trait VolumeObserver {
    fn on_event(&mut self, event: &VolumeEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl VolumeObserver for NoopObserver {
    fn on_event(&mut self, _event: &VolumeEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VolumeObserver for TracingObserver {
    fn on_event(&mut self, event: &VolumeEvent) {
        match *event {
            VolumeEvent::HornPressed => info!("horn pressed"),
            VolumeEvent::HornReleased => info!("horn released"),
            VolumeEvent::DuckingExpired => info!("horn ducking expired"),
            VolumeEvent::HornDuckApplied => debug!("horn duck active"),
            VolumeEvent::NavigationSpeaking => debug!("navigation speaking"),
            VolumeEvent::ReverseGear => debug!("reverse gear active"),
            VolumeEvent::SuddenBrake { drop_kmh } => debug!(drop_kmh, "sudden brake"),
            VolumeEvent::SpeedDecrease { drop_kmh } => debug!(drop_kmh, "speed decrease"),
            VolumeEvent::ManualOverride { requested, applied } => {
                debug!(requested, applied, "manual volume override")
            }
            VolumeEvent::TargetRecomputed { previous, target } => {
                debug!(previous, target, "target volume recomputed")
            }
            VolumeEvent::ConvergenceCapped { steps, gap } => {
                warn!(steps, gap, "convergence step cap reached, snapping to target")
            }
        }
    }
}

/// Keeps every event it sees, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<VolumeEvent>,
}

impl RecordingObserver {
    pub fn events(&self) -> &[VolumeEvent] {
        &self.events
    }

    pub fn contains(&self, event: &VolumeEvent) -> bool {
        self.events.contains(event)
    }

    /// Drops everything recorded so far, returning it.
    pub fn take(&mut self) -> Vec<VolumeEvent> {
        std::mem::take(&mut self.events)
    }
}

impl VolumeObserver for RecordingObserver {
    fn on_event(&mut self, event: &VolumeEvent) {
        self.events.push(*event);
    }
}
