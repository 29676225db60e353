// Frame clock: turns host frame timestamps into a clamped dt.
// A backgrounded tab can hand us a multi-second gap; that must never reach physics.

use crate::config::FrameSettings;
use crate::types::Timestamp;

/// Nominal frame length engines use to convert legacy per-frame constants.
pub const NOMINAL_DT: f32 = 1.0 / 60.0;

/// Timing for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub now: Timestamp,
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Sum of all dt values delivered so far.
    pub elapsed: f64,
}

impl FrameTime {
    /// dt expressed in nominal 60Hz frames.
    pub fn frames(&self) -> f32 {
        self.dt / NOMINAL_DT
    }

    pub fn dt_millis(&self) -> f32 {
        self.dt * 1000.0
    }

    /// A fixed-step frame, for tests and offline stepping.
    pub fn fixed(dt: f32, elapsed: f64) -> Self {
        FrameTime {
            now: Timestamp::from_micros((elapsed * 1_000_000.0) as u64),
            dt,
            elapsed,
        }
    }
}

/// Monotonic clock fed by host timestamps.
#[derive(Debug, Clone)]
pub struct FrameClock {
    settings: FrameSettings,
    last: Option<Timestamp>,
    elapsed: f64,
}

impl FrameClock {
    pub fn new(settings: FrameSettings) -> Self {
        FrameClock {
            settings,
            last: None,
            elapsed: 0.0,
        }
    }

    /// Advance to `now`. The first tick and any tick whose gap exceeds
    /// `max_dt` get `fallback_dt`; a timestamp older than the previous one
    /// yields zero.
    pub fn tick(&mut self, now: Timestamp) -> FrameTime {
        let dt = match self.last {
            None => self.settings.fallback_dt,
            Some(prev) if now <= prev => 0.0,
            Some(prev) => {
                let raw = (now.as_micros() - prev.as_micros()) as f64 / 1_000_000.0;
                self.clamp(raw as f32)
            }
        };
        if self.last.map_or(true, |prev| now > prev) {
            self.last = Some(now);
        }
        self.elapsed += dt as f64;
        FrameTime {
            now,
            dt,
            elapsed: self.elapsed,
        }
    }

    fn clamp(&self, raw: f32) -> f32 {
        if !raw.is_finite() || raw > self.settings.max_dt {
            self.settings.fallback_dt.min(self.settings.max_dt)
        } else {
            raw
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Timestamp {
        Timestamp::from_micros(v * 1000)
    }

    #[test]
    fn first_tick_uses_fallback() {
        let mut clock = FrameClock::new(FrameSettings::default());
        let frame = clock.tick(ms(5_000));
        assert!((frame.dt - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn regular_tick_measures_gap() {
        let mut clock = FrameClock::new(FrameSettings::default());
        clock.tick(ms(1_000));
        let frame = clock.tick(ms(1_020));
        assert!((frame.dt - 0.020).abs() < 1e-6);
    }

    #[test]
    fn backgrounded_tab_gap_is_replaced() {
        let mut clock = FrameClock::new(FrameSettings::default());
        clock.tick(ms(1_000));
        let frame = clock.tick(ms(31_000));
        assert!(frame.dt <= 0.1);
        assert!((frame.dt - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn time_going_backwards_is_zero_dt() {
        let mut clock = FrameClock::new(FrameSettings::default());
        clock.tick(ms(2_000));
        assert_eq!(clock.tick(ms(1_000)).dt, 0.0);
        let frame = clock.tick(ms(2_010));
        assert!((frame.dt - 0.010).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn dt_never_exceeds_max(gaps in prop::collection::vec(0u64..60_000_000, 1..50)) {
            let settings = FrameSettings::default();
            let mut clock = FrameClock::new(settings);
            let mut now = 0u64;
            for gap in gaps {
                now += gap;
                let frame = clock.tick(Timestamp::from_micros(now));
                prop_assert!(frame.dt >= 0.0);
                prop_assert!(frame.dt <= settings.max_dt);
            }
        }
    }
}
