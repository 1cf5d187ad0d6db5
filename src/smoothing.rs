use serde::{Deserialize, Serialize};

/// Computes the next audible level on the way from `current` to `target`.
pub trait ConvergenceStrategy: Send + Sync {
    fn next(&self, current: f32, target: f32, coefficient: f32) -> f32;

    fn name(&self) -> &'static str;
}

/// Moves a fixed fraction of the remaining gap each step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

impl ConvergenceStrategy for Exponential {
    fn next(&self, current: f32, target: f32, coefficient: f32) -> f32 {
        current + (target - current) * coefficient
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

/// Exponential approach with separate rates for rising and falling levels.
///
/// Rising (attack) uses the engine's coefficient; falling (release) uses
/// `release_coefficient`.
#[derive(Debug, Clone, Copy)]
pub struct AttackRelease {
    pub release_coefficient: f32,
}

impl ConvergenceStrategy for AttackRelease {
    fn next(&self, current: f32, target: f32, coefficient: f32) -> f32 {
        let alpha = if target < current {
            // getting quieter -> release
            self.release_coefficient
        } else {
            coefficient
        };
        current + (target - current) * alpha
    }

    fn name(&self) -> &'static str {
        "attack_release"
    }
}

/// Configuration-side selector for the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingConfig {
    #[default]
    Exponential,
    AttackRelease { release_coefficient: f32 },
}

impl SmoothingConfig {
    pub fn build(&self) -> Box<dyn ConvergenceStrategy> {
        match *self {
            SmoothingConfig::Exponential => Box::new(Exponential),
            SmoothingConfig::AttackRelease { release_coefficient } => {
                Box::new(AttackRelease { release_coefficient })
            }
        }
    }
}
