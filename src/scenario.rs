//! Scripted drives for the simulation driver.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::ControlPolicy::{self, Automatic, Manual};
use crate::context::DriveMode::{self, Comfort, Eco, Sport};
use crate::context::VolumeInputs;
use crate::error::LoadError;

type Row = (&'static str, i32, i32, bool, bool, bool, DriveMode, ControlPolicy, i32);

// name, speed, noise, reverse, horn, nav, mode, policy, manual level
#[rustfmt::skip]
const DEFAULT_DRIVE: [Row; 12] = [
    ("Engine Started",              0, 30, false, false, false, Eco,     Automatic, 0),
    ("Acceleration to 50 km/h",    50, 55, false, false, false, Comfort, Automatic, 0),
    ("Horn Pressed",               50, 55, false, true,  false, Comfort, Automatic, 0),
    ("Horn Released",              50, 55, false, false, false, Comfort, Automatic, 0),
    ("Navigation Speaking Started",50, 60, false, false, true,  Sport,   Automatic, 0),
    ("Navigation Speaking Ended",  50, 60, false, false, false, Sport,   Automatic, 0),
    ("User sets Manual Volume 90", 50, 60, false, false, false, Comfort, Manual,   90),
    ("Switch back to Adaptive",    50, 60, false, false, false, Comfort, Automatic, 0),
    ("Reverse Gear Engaged",        0, 40, true,  false, false, Sport,   Automatic, 0),
    ("Reverse to Drive",           30, 40, false, false, false, Sport,   Automatic, 0),
    ("Speed Decreased",            20, 35, false, false, false, Eco,     Automatic, 0),
    ("Sudden Brake",                5, 30, false, false, false, Eco,     Automatic, 0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub name: String,
    #[serde(flatten)]
    pub inputs: VolumeInputs,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Reference drive: start, accelerate, horn, navigation prompt, manual
    /// override, reverse, slowdown and a sudden brake.
    pub fn default_drive() -> Self {
        let steps = DEFAULT_DRIVE
            .into_iter()
            .map(
                |(name, speed, noise, reverse, horn, nav, mode, policy, manual)| ScenarioStep {
                    name: name.to_string(),
                    inputs: VolumeInputs {
                        speed_kmh: speed,
                        cabin_noise_db: noise,
                        reverse_gear: reverse,
                        horn_active: horn,
                        nav_speaking: nav,
                        mode,
                        policy,
                        manual_level: manual,
                    },
                },
            )
            .collect();
        Self { steps }
    }

    /// Adds uniform noise of up to `max_db` to every cabin-noise reading,
    /// emulating a jittery microphone.
    pub fn with_noise_jitter<R: Rng + ?Sized>(mut self, max_db: i32, rng: &mut R) -> Self {
        if max_db <= 0 {
            return self;
        }
        for step in &mut self.steps {
            let jitter = rng.random_range(-max_db..=max_db);
            step.inputs.cabin_noise_db = step.inputs.cabin_noise_db.saturating_add(jitter);
        }
        self
    }
}
