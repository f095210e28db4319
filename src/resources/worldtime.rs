//! Playback clock.
//!
//! The level never owns timekeeping. Whatever drives playback (audio position,
//! editor scrubber, a test) implements [`Clock`] and is read once per tick.
//! [`WorldTime`] is the stock implementation: a scaled, seekable clock.

/// Source of the current playback time.
pub trait Clock {
    /// Current playback time in seconds.
    fn now(&self) -> f32;

    /// Song length in seconds, if the clock knows it.
    fn song_length(&self) -> Option<f32> {
        None
    }
}

impl Clock for f32 {
    fn now(&self) -> f32 {
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub time_scale: f32,
    pub song_length: Option<f32>,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            song_length: None,
        }
    }
}

impl WorldTime {
    /// Advance by `dt` unscaled seconds. Negative `dt` plays backwards.
    pub fn advance(&mut self, dt: f32) {
        let scaled_dt = dt * self.time_scale;
        self.elapsed += scaled_dt;
        self.delta = scaled_dt;
    }

    /// Jump to `time`; `delta` records the jump.
    pub fn seek(&mut self, time: f32) {
        self.delta = time - self.elapsed;
        self.elapsed = time;
    }
}

impl Clock for WorldTime {
    fn now(&self) -> f32 {
        self.elapsed
    }

    fn song_length(&self) -> Option<f32> {
        self.song_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_applies_time_scale() {
        let mut wt = WorldTime {
            time_scale: 0.5,
            ..Default::default()
        };
        wt.advance(2.0);
        assert_eq!(wt.now(), 1.0);
        assert_eq!(wt.delta, 1.0);
    }

    #[test]
    fn seek_records_jump() {
        let mut wt = WorldTime::default();
        wt.advance(5.0);
        wt.seek(2.0);
        assert_eq!(wt.now(), 2.0);
        assert_eq!(wt.delta, -3.0);
    }
}
