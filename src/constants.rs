//! Tuning constants that define the engine's observable behaviour.
//!
//! These are the defaults behind [`crate::config::VolumeConfig`]; changing one
//! here changes what every default-constructed engine computes.

pub const DEFAULT_VOLUME: f32 = 25.0; // start level for current and target
pub const MAX_VOLUME: f32 = 100.0; // manual ceiling
pub const MAX_ADAPTIVE_VOLUME: f32 = 80.0; // automatic ceiling
pub const MIN_VOLUME: f32 = 0.0;

pub const SMOOTH_FACTOR: f32 = 0.3;
// Gap under which convergence snaps current onto target.
pub const CONVERGENCE_EPSILON: f32 = 0.5;
pub const MAX_CONVERGENCE_STEPS: u32 = 1000;

pub const HORN_DUCK_MULTIPLIER: f32 = 0.6;
pub const HORN_DUCK_WINDOW_MS: u64 = 500;
pub const NAV_DUCK_MULTIPLIER: f32 = 0.5;
pub const REVERSE_MULTIPLIER: f32 = 0.25;

/// Speed drop (km/h between two updates) above which braking counts as sudden.
pub const SUDDEN_BRAKE_DELTA_KMH: i64 = 10;
pub const SUDDEN_BRAKE_MULTIPLIER: f32 = 0.5;
pub const SPEED_DECREASE_MULTIPLIER: f32 = 0.9;

pub const BASE_VOLUME: f32 = 25.0;
pub const HIGH_SPEED_KMH: i32 = 70;
pub const HIGH_SPEED_BONUS: f32 = 15.0;
pub const MID_SPEED_KMH: i32 = 30;
pub const MID_SPEED_BONUS: f32 = 10.0;
pub const LOW_SPEED_BONUS: f32 = 5.0;
pub const NOISE_COEFFICIENT: f32 = 0.2;

pub const ECO_MULTIPLIER: f32 = 0.8;
pub const COMFORT_MULTIPLIER: f32 = 1.0;
pub const SPORT_MULTIPLIER: f32 = 1.2;

/// Cabin noise assumed before the first reading arrives.
pub const DEFAULT_CABIN_NOISE: i32 = 30;
