// Single shared producer for the external signals. One hub per page; every
// engine reads the same snapshot. Raw values only: engines smooth for themselves.

use crate::types::{SignalBundle, Timestamp};

/// Pointer position used when the pointer is off every surface.
pub const OFF_SURFACE: f32 = -500.0;

/// Scroll samples further apart than this restart velocity estimation.
const SCROLL_GAP_US: u64 = 250_000;

#[derive(Debug, Clone)]
pub struct SignalHub {
    origin: Option<Timestamp>,
    pointer: (f32, f32),
    last_scroll: Option<(Timestamp, f32)>,
    scroll_velocity: f32,
    progress: u8,
    load_complete: bool,
}

impl SignalHub {
    pub fn new() -> Self {
        SignalHub {
            origin: None,
            pointer: (OFF_SURFACE, OFF_SURFACE),
            last_scroll: None,
            scroll_velocity: 0.0,
            progress: 0,
            load_complete: false,
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = (x, y);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer = (OFF_SURFACE, OFF_SURFACE);
    }

    /// Record a raw scroll offset. Velocity is the finite difference against
    /// the previous sample, in px/s.
    pub fn scroll(&mut self, offset: f32, now: Timestamp) {
        if !offset.is_finite() {
            return;
        }
        self.scroll_velocity = match self.last_scroll {
            Some((prev_t, prev_offset)) if now > prev_t => {
                let gap = now.as_micros() - prev_t.as_micros();
                if gap > SCROLL_GAP_US {
                    0.0
                } else {
                    (offset - prev_offset) / (gap as f32 / 1_000_000.0)
                }
            }
            Some(_) => self.scroll_velocity,
            None => 0.0,
        };
        self.last_scroll = Some((now, offset));
    }

    /// Progress is monotonic and capped: repeats and decreases are no-ops.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn complete_loading(&mut self) {
        self.load_complete = true;
        self.progress = 100;
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Snapshot for one frame. Scroll velocity decays to zero once the
    /// input has been quiet for a while.
    pub fn snapshot(&mut self, now: Timestamp) -> SignalBundle {
        let origin = *self.origin.get_or_insert(now);
        if let Some((t, _)) = self.last_scroll {
            if now.as_micros().saturating_sub(t.as_micros()) > SCROLL_GAP_US {
                self.scroll_velocity = 0.0;
            }
        }
        SignalBundle {
            pointer_x: self.pointer.0,
            pointer_y: self.pointer.1,
            scroll_velocity: self.scroll_velocity,
            hover_active: false,
            elapsed: now.as_secs() - origin.as_secs(),
            progress: self.progress,
            load_complete: self.load_complete,
        }
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Timestamp {
        Timestamp::from_micros(v * 1000)
    }

    #[test]
    fn scroll_velocity_from_offsets() {
        let mut hub = SignalHub::new();
        hub.scroll(0.0, ms(0));
        hub.scroll(100.0, ms(100));
        let snap = hub.snapshot(ms(100));
        assert!((snap.scroll_velocity - 1000.0).abs() < 0.01);
    }

    #[test]
    fn quiet_scroll_decays_to_zero() {
        let mut hub = SignalHub::new();
        hub.scroll(0.0, ms(0));
        hub.scroll(100.0, ms(100));
        assert_eq!(hub.snapshot(ms(1_000)).scroll_velocity, 0.0);
    }

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut hub = SignalHub::new();
        hub.set_progress(45);
        hub.set_progress(10);
        assert_eq!(hub.progress(), 45);
        hub.set_progress(250);
        assert_eq!(hub.progress(), 100);
        hub.set_progress(100);
        assert_eq!(hub.progress(), 100);
    }

    #[test]
    fn pointer_leave_moves_off_surface() {
        let mut hub = SignalHub::new();
        hub.pointer_move(10.0, 20.0);
        hub.pointer_leave();
        let snap = hub.snapshot(ms(0));
        assert_eq!(snap.pointer_x, OFF_SURFACE);
    }

    #[test]
    fn elapsed_counts_from_first_snapshot() {
        let mut hub = SignalHub::new();
        hub.snapshot(ms(1_000));
        let snap = hub.snapshot(ms(3_500));
        assert!((snap.elapsed - 2.5).abs() < 1e-9);
    }
}
