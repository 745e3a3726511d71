use bevy::prelude::*;

/// Monotonic simulation time in seconds, read once per tick.
///
/// Cooldowns and timed expiry are plain deadline comparisons against this value.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: f64,
    last_delta: f64,
    paused: bool,
}

impl SimClock {
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Seconds covered by the most recent advance (zero while paused).
    pub fn delta(&self) -> f64 {
        self.last_delta
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advance by `dt` seconds. Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || !dt.is_finite() || dt < 0.0 {
            self.last_delta = 0.0;
            return;
        }
        self.now += dt;
        self.last_delta = dt;
    }
}

/// System that copies bevy's frame delta into the simulation clock.
pub fn advance_sim_clock(time: Res<Time>, mut clock: ResMut<SimClock>) {
    clock.advance(time.delta_secs_f64());
}
