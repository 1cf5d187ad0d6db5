use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CABIN_NOISE;

/// Driving mode selected by the driver; scales the automatic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    Eco,
    #[default]
    Comfort,
    Sport,
}

impl DriveMode {
    pub fn label(self) -> &'static str {
        match self {
            DriveMode::Eco => "Eco",
            DriveMode::Comfort => "Comfort",
            DriveMode::Sport => "Sport",
        }
    }
}

/// Whether the target is derived by the rule set or set by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPolicy {
    #[default]
    Automatic,
    Manual,
}

/// One complete reading from the input source.
///
/// `manual_level` is only consulted when `policy` is [`ControlPolicy::Manual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeInputs {
    pub speed_kmh: i32,
    pub cabin_noise_db: i32,
    pub reverse_gear: bool,
    pub horn_active: bool,
    pub nav_speaking: bool,
    pub mode: DriveMode,
    pub policy: ControlPolicy,
    pub manual_level: i32,
}

impl VolumeInputs {
    /// Automatic-policy reading with no events and comfort mode.
    pub fn cruising(speed_kmh: i32, cabin_noise_db: i32) -> Self {
        Self {
            speed_kmh,
            cabin_noise_db,
            ..Self::default()
        }
    }

    /// Manual-policy reading requesting `level`.
    pub fn manual(level: i32) -> Self {
        Self {
            policy: ControlPolicy::Manual,
            manual_level: level,
            cabin_noise_db: DEFAULT_CABIN_NOISE,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: DriveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_horn(mut self, active: bool) -> Self {
        self.horn_active = active;
        self
    }

    pub fn with_nav(mut self, speaking: bool) -> Self {
        self.nav_speaking = speaking;
        self
    }

    pub fn with_reverse(mut self, engaged: bool) -> Self {
        self.reverse_gear = engaged;
        self
    }
}

/// The engine's working memory of the cabin right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub speed_kmh: i32,
    /// Speed seen by the update before the latest one; only used to detect deceleration.
    pub previous_speed_kmh: i32,
    pub cabin_noise_db: i32,
    pub reverse_gear: bool,
    pub horn_active: bool,
    pub nav_speaking: bool,
    pub mode: DriveMode,
    pub policy: ControlPolicy,
    pub manual_level: i32,
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self {
            speed_kmh: 0,
            previous_speed_kmh: 0,
            cabin_noise_db: DEFAULT_CABIN_NOISE,
            reverse_gear: false,
            horn_active: false,
            nav_speaking: false,
            mode: DriveMode::Comfort,
            policy: ControlPolicy::Automatic,
            manual_level: 0,
        }
    }
}

impl ContextSnapshot {
    /// Overwrites the snapshot with a new reading, shifting the current speed
    /// into `previous_speed_kmh`.
    ///
    /// The manual level is only taken over while the manual policy is
    /// selected, so switching back to manual later restores the last
    /// requested level until a new one arrives.
    pub fn apply(&mut self, inputs: &VolumeInputs) {
        self.previous_speed_kmh = self.speed_kmh;
        self.speed_kmh = inputs.speed_kmh;
        self.cabin_noise_db = inputs.cabin_noise_db;
        self.reverse_gear = inputs.reverse_gear;
        self.horn_active = inputs.horn_active;
        self.nav_speaking = inputs.nav_speaking;
        self.mode = inputs.mode;
        self.policy = inputs.policy;
        if inputs.policy == ControlPolicy::Manual {
            self.manual_level = inputs.manual_level;
        }
    }

    /// Speed lost since the previous update; negative when accelerating.
    pub fn speed_drop(&self) -> i64 {
        i64::from(self.previous_speed_kmh) - i64::from(self.speed_kmh)
    }
}
