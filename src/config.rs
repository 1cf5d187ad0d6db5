//! Engine tuning, loadable from JSON.
//!
//! Every field defaults to the matching value in [`crate::constants`], so a
//! config file only needs to name what it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::context::DriveMode;
use crate::error::LoadError;
use crate::smoothing::SmoothingConfig;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "ADAPTIVE_VOL_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedBands {
    pub high_kmh: i32,
    pub high_bonus: f32,
    pub mid_kmh: i32,
    pub mid_bonus: f32,
    /// Bonus for any positive speed up to `mid_kmh`.
    pub low_bonus: f32,
}

impl Default for SpeedBands {
    fn default() -> Self {
        Self {
            high_kmh: HIGH_SPEED_KMH,
            high_bonus: HIGH_SPEED_BONUS,
            mid_kmh: MID_SPEED_KMH,
            mid_bonus: MID_SPEED_BONUS,
            low_bonus: LOW_SPEED_BONUS,
        }
    }
}

impl SpeedBands {
    pub fn bonus(&self, speed_kmh: i32) -> f32 {
        if speed_kmh > self.high_kmh {
            self.high_bonus
        } else if speed_kmh > self.mid_kmh {
            self.mid_bonus
        } else if speed_kmh > 0 {
            self.low_bonus
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeMultipliers {
    pub eco: f32,
    pub comfort: f32,
    pub sport: f32,
}

impl Default for ModeMultipliers {
    fn default() -> Self {
        Self {
            eco: ECO_MULTIPLIER,
            comfort: COMFORT_MULTIPLIER,
            sport: SPORT_MULTIPLIER,
        }
    }
}

impl ModeMultipliers {
    pub fn for_mode(&self, mode: DriveMode) -> f32 {
        match mode {
            DriveMode::Eco => self.eco,
            DriveMode::Comfort => self.comfort,
            DriveMode::Sport => self.sport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub default_volume: f32,
    pub min_volume: f32,
    pub max_adaptive_volume: f32,
    pub max_volume: f32,

    pub base_volume: f32,
    pub speed_bands: SpeedBands,
    pub noise_coefficient: f32,
    pub modes: ModeMultipliers,

    pub horn_duck_multiplier: f32,
    pub horn_duck_window_ms: u64,
    pub nav_duck_multiplier: f32,
    pub reverse_multiplier: f32,
    pub sudden_brake_delta_kmh: i64,
    pub sudden_brake_multiplier: f32,
    pub speed_decrease_multiplier: f32,

    pub smooth_factor: f32,
    pub convergence_epsilon: f32,
    pub max_convergence_steps: u32,
    pub smoothing: SmoothingConfig,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            min_volume: MIN_VOLUME,
            max_adaptive_volume: MAX_ADAPTIVE_VOLUME,
            max_volume: MAX_VOLUME,
            base_volume: BASE_VOLUME,
            speed_bands: SpeedBands::default(),
            noise_coefficient: NOISE_COEFFICIENT,
            modes: ModeMultipliers::default(),
            horn_duck_multiplier: HORN_DUCK_MULTIPLIER,
            horn_duck_window_ms: HORN_DUCK_WINDOW_MS,
            nav_duck_multiplier: NAV_DUCK_MULTIPLIER,
            reverse_multiplier: REVERSE_MULTIPLIER,
            sudden_brake_delta_kmh: SUDDEN_BRAKE_DELTA_KMH,
            sudden_brake_multiplier: SUDDEN_BRAKE_MULTIPLIER,
            speed_decrease_multiplier: SPEED_DECREASE_MULTIPLIER,
            smooth_factor: SMOOTH_FACTOR,
            convergence_epsilon: CONVERGENCE_EPSILON,
            max_convergence_steps: MAX_CONVERGENCE_STEPS,
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl VolumeConfig {
    pub fn horn_duck_window(&self) -> Duration {
        Duration::from_millis(self.horn_duck_window_ms)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Loads the file named by `ADAPTIVE_VOL_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self, LoadError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Rejects settings that would let a level leave its range or stop
    /// convergence from settling.
    pub fn validate(&self) -> Result<(), LoadError> {
        unit_interval("smooth_factor", self.smooth_factor)?;
        if let SmoothingConfig::AttackRelease {
            release_coefficient,
        } = self.smoothing
        {
            unit_interval("smoothing.release_coefficient", release_coefficient)?;
        }

        let finite = [
            ("default_volume", self.default_volume),
            ("base_volume", self.base_volume),
            ("noise_coefficient", self.noise_coefficient),
            ("speed_bands.high_bonus", self.speed_bands.high_bonus),
            ("speed_bands.mid_bonus", self.speed_bands.mid_bonus),
            ("speed_bands.low_bonus", self.speed_bands.low_bonus),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(out_of_range(field, "finite values", value));
            }
        }

        let factors = [
            ("modes.eco", self.modes.eco),
            ("modes.comfort", self.modes.comfort),
            ("modes.sport", self.modes.sport),
            ("horn_duck_multiplier", self.horn_duck_multiplier),
            ("nav_duck_multiplier", self.nav_duck_multiplier),
            ("reverse_multiplier", self.reverse_multiplier),
            ("sudden_brake_multiplier", self.sudden_brake_multiplier),
            ("speed_decrease_multiplier", self.speed_decrease_multiplier),
        ];
        for (field, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(out_of_range(field, "[0, inf)", value));
            }
        }

        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon <= 0.0 {
            return Err(out_of_range(
                "convergence_epsilon",
                "(0, inf)",
                self.convergence_epsilon,
            ));
        }
        if self.max_convergence_steps == 0 {
            return Err(LoadError::OutOfRange {
                field: "max_convergence_steps",
                range: "[1, inf)",
                value: 0.0,
            });
        }

        let ordered = self.min_volume.is_finite()
            && self.max_adaptive_volume.is_finite()
            && self.max_volume.is_finite()
            && self.min_volume < self.max_adaptive_volume
            && self.max_adaptive_volume <= self.max_volume;
        if !ordered {
            return Err(LoadError::CeilingOrder {
                floor: self.min_volume,
                automatic: self.max_adaptive_volume,
                manual: self.max_volume,
            });
        }

        if self.default_volume < self.min_volume || self.default_volume > self.max_volume {
            return Err(out_of_range(
                "default_volume",
                "[min_volume, max_volume]",
                self.default_volume,
            ));
        }
        Ok(())
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), LoadError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(out_of_range(field, "(0, 1]", value))
    }
}

fn out_of_range(field: &'static str, range: &'static str, value: f32) -> LoadError {
    LoadError::OutOfRange {
        field,
        range,
        value: f64::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        VolumeConfig::default().validate().unwrap();
    }

    #[test]
    fn speed_bands_are_exclusive() {
        let bands = SpeedBands::default();
        assert_eq!(bands.bonus(-5), 0.0);
        assert_eq!(bands.bonus(0), 0.0);
        assert_eq!(bands.bonus(1), 5.0);
        assert_eq!(bands.bonus(30), 5.0);
        assert_eq!(bands.bonus(31), 10.0);
        assert_eq!(bands.bonus(70), 10.0);
        assert_eq!(bands.bonus(71), 15.0);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg = VolumeConfig::from_json_str(
            r#"{"horn_duck_window_ms": 1200, "modes": {"sport": 1.5}}"#,
        )
        .unwrap();
        assert_eq!(cfg.horn_duck_window(), Duration::from_millis(1200));
        assert_eq!(cfg.modes.sport, 1.5);
        assert_eq!(cfg.modes.eco, ECO_MULTIPLIER);
        assert_eq!(cfg.max_adaptive_volume, MAX_ADAPTIVE_VOLUME);
    }

    #[test]
    fn rejects_smooth_factor_outside_unit_interval() {
        for bad in ["0.0", "1.5", "-0.2"] {
            let err = VolumeConfig::from_json_str(&format!(r#"{{"smooth_factor": {bad}}}"#))
                .unwrap_err();
            assert!(matches!(
                err,
                LoadError::OutOfRange {
                    field: "smooth_factor",
                    ..
                }
            ));
        }
    }

    #[test]
    fn rejects_inverted_ceilings() {
        let err = VolumeConfig::from_json_str(r#"{"max_adaptive_volume": 120}"#).unwrap_err();
        assert!(matches!(err, LoadError::CeilingOrder { .. }));
    }

    #[test]
    fn rejects_default_volume_outside_range() {
        for bad in ["500", "-1", "100.5"] {
            let err = VolumeConfig::from_json_str(&format!(r#"{{"default_volume": {bad}}}"#))
                .unwrap_err();
            assert!(matches!(
                err,
                LoadError::OutOfRange {
                    field: "default_volume",
                    ..
                }
            ));
        }
        // Above the automatic ceiling is still a valid manual-range start.
        let cfg = VolumeConfig::from_json_str(r#"{"default_volume": 100}"#).unwrap();
        assert_eq!(cfg.default_volume, 100.0);
    }

    #[test]
    fn rejects_negative_factor() {
        let err = VolumeConfig::from_json_str(r#"{"reverse_multiplier": -0.5}"#).unwrap_err();
        assert!(err.to_string().contains("reverse_multiplier"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = VolumeConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"smooth_factor": 0.5}}"#).unwrap();
        let cfg = VolumeConfig::load(file.path()).unwrap();
        assert_eq!(cfg.smooth_factor, 0.5);
    }
}
