//! Volume decision engine.
//!
//! Each [`VolumeEngine::update`] turns one complete input reading into a new
//! target level; [`VolumeEngine::advance_toward_target`] moves the audible
//! level one step closer to it. The engine never sleeps and never spawns
//! anything, so pacing the convergence is left to the caller.
//!
//! ```ignore
//! let mut engine = VolumeEngine::new();
//! engine.update(VolumeInputs::cruising(50, 50));
//! engine.settle();
//! assert_eq!(engine.current_level(), engine.target_level());
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::VolumeConfig;
use crate::context::{ContextSnapshot, ControlPolicy, VolumeInputs};
use crate::ducking::{DuckTransition, DuckingState};
use crate::error::LoadError;
use crate::events::{TracingObserver, VolumeEvent, VolumeObserver};
use crate::smoothing::ConvergenceStrategy;

/// Snapshot of the engine for presentation, taken after an update or settle.
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    pub event: String,
    pub context: ContextSnapshot,
    pub ducking: bool,
    pub target: f32,
    pub current: f32,
    pub steps: u32,
}

pub struct VolumeEngine<C: Clock = SystemClock, O: VolumeObserver = TracingObserver> {
    config: VolumeConfig,
    clock: C,
    observer: O,
    strategy: Box<dyn ConvergenceStrategy>,
    context: ContextSnapshot,
    ducking: DuckingState,
    target: f32,
    current: f32,
}

impl VolumeEngine {
    /// Engine with the built-in tuning, the system clock and tracing output.
    pub fn new() -> Self {
        Self::from_parts(VolumeConfig::default(), SystemClock, TracingObserver)
    }
}

impl Default for VolumeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock, O: VolumeObserver> VolumeEngine<C, O> {
    pub fn with_config(config: VolumeConfig, clock: C, observer: O) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self::from_parts(config, clock, observer))
    }

    fn from_parts(config: VolumeConfig, clock: C, observer: O) -> Self {
        let strategy = config.smoothing.build();
        Self {
            clock,
            observer,
            strategy,
            context: ContextSnapshot::default(),
            ducking: DuckingState::default(),
            target: config.default_volume,
            current: config.default_volume,
            config,
        }
    }

    /// Replaces the configured convergence strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn ConvergenceStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current_level(&self) -> f32 {
        self.current
    }

    pub fn target_level(&self) -> f32 {
        self.target
    }

    pub fn context(&self) -> &ContextSnapshot {
        &self.context
    }

    pub fn is_ducking(&self) -> bool {
        self.ducking.is_active()
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Whether the audible level is within the convergence epsilon of the target.
    pub fn is_settled(&self) -> bool {
        (self.target - self.current).abs() <= self.config.convergence_epsilon
    }

    pub fn report(&self, event: impl Into<String>, steps: u32) -> LevelReport {
        LevelReport {
            event: event.into(),
            context: self.context,
            ducking: self.ducking.is_active(),
            target: self.target,
            current: self.current,
            steps,
        }
    }

    // ── Update ───────────────────────────────────────────────────────

    /// Takes a new reading and recomputes the target level.
    ///
    /// Accepts any values; out-of-range numbers are absorbed by the final clamp.
    pub fn update(&mut self, inputs: VolumeInputs) {
        let was_pressed = self.context.horn_active;
        let previous_policy = self.context.policy;
        self.context.apply(&inputs);

        if inputs.horn_active && !was_pressed {
            self.emit(VolumeEvent::HornPressed);
        } else if !inputs.horn_active && was_pressed {
            self.emit(VolumeEvent::HornReleased);
        }

        self.handle_horn_ducking(was_pressed, inputs.horn_active);

        if previous_policy != self.context.policy {
            info!(policy = ?self.context.policy, "control policy changed");
        }

        let previous = self.target;
        self.target = self.calculate_target_volume();
        self.emit(VolumeEvent::TargetRecomputed {
            previous,
            target: self.target,
        });
    }

    fn handle_horn_ducking(&mut self, was_pressed: bool, pressed: bool) {
        let now = self.clock.now();
        let window = self.config.horn_duck_window();
        match self.ducking.evaluate(was_pressed, pressed, now, window) {
            DuckTransition::Expired => self.emit(VolumeEvent::DuckingExpired),
            DuckTransition::Released => {
                debug!(window_ms = self.config.horn_duck_window_ms, "ducking window restarted on release")
            }
            DuckTransition::Pressed | DuckTransition::Holding | DuckTransition::Idle => {}
        }
    }

    fn calculate_target_volume(&mut self) -> f32 {
        let cfg = self.config;
        match self.context.policy {
            ControlPolicy::Manual => {
                let requested = self.context.manual_level;
                let applied = saturate(requested as f32, cfg.min_volume, cfg.max_volume);
                self.emit(VolumeEvent::ManualOverride { requested, applied });
                applied
            }
            ControlPolicy::Automatic => {
                let mut level = cfg.base_volume;
                level += cfg.speed_bands.bonus(self.context.speed_kmh);
                level += self.context.cabin_noise_db as f32 * cfg.noise_coefficient;
                level *= cfg.modes.for_mode(self.context.mode);
                self.apply_volume_modifiers(level)
            }
        }
    }

    /// Event attenuations, applied in order and compounding multiplicatively.
    fn apply_volume_modifiers(&mut self, mut level: f32) -> f32 {
        let cfg = self.config;

        if self.ducking.is_active() {
            self.emit(VolumeEvent::HornDuckApplied);
            level *= cfg.horn_duck_multiplier;
        }

        if self.context.nav_speaking {
            self.emit(VolumeEvent::NavigationSpeaking);
            level *= cfg.nav_duck_multiplier;
        }

        // Reverse and deceleration are mutually exclusive.
        if self.context.reverse_gear {
            self.emit(VolumeEvent::ReverseGear);
            level *= cfg.reverse_multiplier;
        } else {
            let drop_kmh = self.context.speed_drop();
            if drop_kmh > cfg.sudden_brake_delta_kmh {
                self.emit(VolumeEvent::SuddenBrake { drop_kmh });
                level *= cfg.sudden_brake_multiplier;
            } else if drop_kmh > 0 {
                self.emit(VolumeEvent::SpeedDecrease { drop_kmh });
                level *= cfg.speed_decrease_multiplier;
            }
        }

        saturate(level, cfg.min_volume, cfg.max_adaptive_volume)
    }

    // ── Convergence ──────────────────────────────────────────────────

    /// Moves the audible level one step toward the target.
    ///
    /// The result is kept between the old level and the target, so a step
    /// can never overshoot whatever strategy is installed.
    pub fn advance_toward_target(&mut self) {
        let next = self
            .strategy
            .next(self.current, self.target, self.config.smooth_factor);
        if next.is_nan() {
            return;
        }
        let (lo, hi) = if self.current <= self.target {
            (self.current, self.target)
        } else {
            (self.target, self.current)
        };
        self.current = next.clamp(lo, hi);
        debug!(current = self.current, target = self.target, "volume step");
    }

    /// Steps until settled, then snaps exactly onto the target. Returns the
    /// number of steps taken.
    pub fn settle(&mut self) -> u32 {
        self.settle_with(|_, _| {})
    }

    /// Like [`settle`](Self::settle), calling `on_step` after every step.
    pub fn settle_with<F>(&mut self, mut on_step: F) -> u32
    where
        F: FnMut(&Self, u32),
    {
        let cap = self.config.max_convergence_steps;
        let mut steps = 0;
        while !self.is_settled() && steps < cap {
            self.advance_toward_target();
            steps += 1;
            on_step(self, steps);
        }
        if !self.is_settled() {
            let gap = (self.target - self.current).abs();
            self.emit(VolumeEvent::ConvergenceCapped { steps, gap });
        }
        self.current = self.target;
        steps
    }

    fn emit(&mut self, event: VolumeEvent) {
        self.observer.on_event(&event);
    }
}

impl<C: Clock, O: VolumeObserver> fmt::Debug for VolumeEngine<C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeEngine")
            .field("context", &self.context)
            .field("ducking", &self.ducking)
            .field("target", &self.target)
            .field("current", &self.current)
            .field("strategy", &self.strategy.name())
            .finish_non_exhaustive()
    }
}

// Clamp that also maps NaN to the floor.
fn saturate(level: f32, floor: f32, ceiling: f32) -> f32 {
    if level.is_nan() {
        floor
    } else {
        level.clamp(floor, ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::context::DriveMode;
    use crate::events::RecordingObserver;
    use crate::smoothing::AttackRelease;
    use std::time::Duration;

    fn engine() -> (VolumeEngine<ManualClock, RecordingObserver>, ManualClock) {
        let clock = ManualClock::new();
        let engine = VolumeEngine::with_config(
            VolumeConfig::default(),
            clock.clone(),
            RecordingObserver::default(),
        )
        .unwrap();
        (engine, clock)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn starts_at_default_level() {
        let (engine, _) = engine();
        assert_eq!(engine.current_level(), 25.0);
        assert_eq!(engine.target_level(), 25.0);
        assert!(!engine.is_ducking());
        assert_eq!(engine.context().cabin_noise_db, 30);
        assert_eq!(engine.context().policy, ControlPolicy::Automatic);
    }

    #[test]
    fn manual_policy_bypasses_modifiers() {
        let (mut engine, _) = engine();
        let inputs = VolumeInputs {
            reverse_gear: true,
            horn_active: true,
            nav_speaking: true,
            mode: DriveMode::Eco,
            ..VolumeInputs::manual(60)
        };
        engine.update(inputs);
        assert_eq!(engine.target_level(), 60.0);
        assert!(engine.is_ducking());
    }

    #[test]
    fn manual_level_saturates_at_floor() {
        let (mut engine, _) = engine();
        engine.update(VolumeInputs::manual(-40));
        assert_eq!(engine.target_level(), 0.0);
    }

    #[test]
    fn mode_multipliers_scale_base() {
        let (mut engine, _) = engine();
        engine.update(VolumeInputs::cruising(50, 50).with_mode(DriveMode::Eco));
        assert!(close(engine.target_level(), 36.0));
        engine.update(VolumeInputs::cruising(50, 50).with_mode(DriveMode::Sport));
        assert!(close(engine.target_level(), 54.0));
    }

    #[test]
    fn reverse_emits_no_brake_event() {
        let (mut engine, _) = engine();
        engine.update(VolumeInputs::cruising(60, 40));
        engine.observer_mut().take();
        engine.update(VolumeInputs::cruising(0, 40).with_reverse(true));
        let events = engine.observer().events();
        assert!(events.contains(&VolumeEvent::ReverseGear));
        assert!(!events
            .iter()
            .any(|e| matches!(e, VolumeEvent::SuddenBrake { .. } | VolumeEvent::SpeedDecrease { .. })));
    }

    #[test]
    fn horn_edges_are_reported() {
        let (mut engine, clock) = engine();
        engine.update(VolumeInputs::cruising(50, 50).with_horn(true));
        engine.update(VolumeInputs::cruising(50, 50));
        clock.advance(Duration::from_millis(500));
        engine.update(VolumeInputs::cruising(50, 50));
        let events = engine.observer().events();
        assert!(events.contains(&VolumeEvent::HornPressed));
        assert!(events.contains(&VolumeEvent::HornReleased));
        assert!(events.contains(&VolumeEvent::DuckingExpired));
        assert!(!engine.is_ducking());
    }

    #[test]
    fn settle_reaches_target_exactly() {
        let (mut engine, _) = engine();
        engine.update(VolumeInputs::cruising(80, 60));
        let mut seen = Vec::new();
        let steps = engine.settle_with(|e, step| seen.push((step, e.current_level())));
        assert!(steps > 0);
        assert_eq!(seen.len() as u32, steps);
        assert_eq!(engine.current_level(), engine.target_level());
    }

    #[test]
    fn settle_on_settled_engine_takes_no_steps() {
        let (mut engine, _) = engine();
        assert_eq!(engine.settle(), 0);
    }

    #[test]
    fn step_cap_still_snaps() {
        let config = VolumeConfig {
            max_convergence_steps: 2,
            ..VolumeConfig::default()
        };
        let mut engine =
            VolumeEngine::with_config(config, ManualClock::new(), RecordingObserver::default())
                .unwrap();
        engine.update(VolumeInputs::manual(100));
        assert_eq!(engine.settle(), 2);
        assert_eq!(engine.current_level(), 100.0);
        assert!(engine
            .observer()
            .events()
            .iter()
            .any(|e| matches!(e, VolumeEvent::ConvergenceCapped { steps: 2, .. })));
    }

    #[test]
    fn custom_strategy_cannot_overshoot() {
        struct Overshoot;
        impl ConvergenceStrategy for Overshoot {
            fn next(&self, current: f32, target: f32, _coefficient: f32) -> f32 {
                current + (target - current) * 3.0
            }
            fn name(&self) -> &'static str {
                "overshoot"
            }
        }

        let (engine, _) = engine();
        let mut engine = engine.with_strategy(Box::new(Overshoot));
        engine.update(VolumeInputs::manual(40));
        engine.advance_toward_target();
        assert_eq!(engine.current_level(), 40.0);
        assert_eq!(engine.strategy_name(), "overshoot");
    }

    #[test]
    fn attack_release_from_config() {
        let config = VolumeConfig {
            smoothing: crate::smoothing::SmoothingConfig::AttackRelease {
                release_coefficient: 0.1,
            },
            ..VolumeConfig::default()
        };
        let mut engine =
            VolumeEngine::with_config(config, ManualClock::new(), RecordingObserver::default())
                .unwrap();
        engine.update(VolumeInputs::manual(5));
        engine.advance_toward_target();
        assert!(close(engine.current_level(), 23.0));

        let engine = engine.with_strategy(Box::new(AttackRelease {
            release_coefficient: 0.5,
        }));
        assert_eq!(engine.strategy_name(), "attack_release");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = VolumeConfig {
            smooth_factor: 0.0,
            ..VolumeConfig::default()
        };
        assert!(
            VolumeEngine::with_config(config, ManualClock::new(), RecordingObserver::default())
                .is_err()
        );
    }

    #[test]
    fn out_of_range_start_level_is_rejected() {
        let config = VolumeConfig {
            default_volume: 500.0,
            ..VolumeConfig::default()
        };
        let err =
            VolumeEngine::with_config(config, ManualClock::new(), RecordingObserver::default())
                .unwrap_err();
        assert!(matches!(
            err,
            LoadError::OutOfRange {
                field: "default_volume",
                ..
            }
        ));
    }

    #[test]
    fn exposes_config_and_clock() {
        let config = VolumeConfig {
            horn_duck_window_ms: 800,
            ..VolumeConfig::default()
        };
        let clock = ManualClock::new();
        let mut engine =
            VolumeEngine::with_config(config, clock.clone(), RecordingObserver::default())
                .unwrap();
        assert_eq!(engine.config().horn_duck_window(), Duration::from_millis(800));

        clock.advance(Duration::from_millis(300));
        assert_eq!(engine.clock().elapsed(), Duration::from_millis(300));

        engine.update(VolumeInputs::cruising(50, 50).with_horn(true));
        engine.update(VolumeInputs::cruising(50, 50));
        // 500 ms would expire the default window but not this one.
        engine.clock().advance(Duration::from_millis(500));
        engine.update(VolumeInputs::cruising(50, 50));
        assert!(engine.is_ducking());
        assert!(!engine.observer().contains(&VolumeEvent::DuckingExpired));

        clock.advance(Duration::from_millis(300));
        engine.update(VolumeInputs::cruising(50, 50));
        assert!(engine.observer().contains(&VolumeEvent::DuckingExpired));
    }

    #[test]
    fn report_serializes() {
        let (mut engine, _) = engine();
        engine.update(VolumeInputs::cruising(50, 50));
        let steps = engine.settle();
        let json = serde_json::to_value(engine.report("cruise", steps)).unwrap();
        assert_eq!(json["event"], "cruise");
        assert_eq!(json["context"]["speed_kmh"], 50);
        assert_eq!(json["steps"], steps);
    }
}
