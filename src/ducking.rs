//! Horn ducking: a two-state machine that keeps the level attenuated for a
//! fixed window after the horn was last held or released.
//!
//! ```text
//! Inactive --horn down / horn released--> Active (window restarts)
//! Active   --window elapsed at next update--> Inactive
//! ```
//!
//! There is no background timer. Expiry is checked lazily on the next update,
//! so the state may read as active past its window until new input arrives.

use std::time::{Duration, Instant};

/// What a single evaluation of the machine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuckTransition {
    /// Horn held; window restarted.
    Pressed,
    /// Horn released this cycle; a fresh full window starts now.
    Released,
    Expired,
    /// Still inside the window.
    Holding,
    Idle,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DuckingState {
    active: bool,
    window_start: Option<Instant>,
}

impl DuckingState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }

    /// Advances the machine for one update.
    ///
    /// `was_pressed` is the horn flag from the previous update, `pressed` the
    /// new one.
    pub fn evaluate(
        &mut self,
        was_pressed: bool,
        pressed: bool,
        now: Instant,
        window: Duration,
    ) -> DuckTransition {
        if pressed {
            self.arm(now);
            DuckTransition::Pressed
        } else if was_pressed {
            // Release restarts the window instead of continuing the held one.
            self.arm(now);
            DuckTransition::Released
        } else if self.active {
            let elapsed = self
                .window_start
                .map(|start| now.saturating_duration_since(start))
                .unwrap_or(window);
            if elapsed >= window {
                self.active = false;
                DuckTransition::Expired
            } else {
                DuckTransition::Holding
            }
        } else {
            DuckTransition::Idle
        }
    }

    fn arm(&mut self, now: Instant) {
        self.active = true;
        self.window_start = Some(now);
    }
}
