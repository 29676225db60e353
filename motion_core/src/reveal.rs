// Pointer-reactive radial reveal and the click-centred radial wipe.
// Both are pure composition rules over a pointer position and a clock;
// the host applies the resulting mask to a highlighted copy of the content.

use serde::Serialize;

use crate::easing::ease_in_out;
use crate::nodes::{NodeHost, NodeId};
use crate::signals::OFF_SURFACE;
use crate::surface::{GradientStop, Paint};
use crate::types::{Rgba, Timestamp};

/// Circular mask keyed to the pointer: opaque at the pointer, fading to
/// transparent at `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialReveal {
    radius: f32,
    x: f32,
    y: f32,
}

impl RadialReveal {
    pub fn new(radius: f32) -> Self {
        RadialReveal {
            radius: radius.max(0.0),
            x: OFF_SURFACE,
            y: OFF_SURFACE,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Pointer in element-local pixels.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.x = x;
            self.y = y;
        }
    }

    /// Park the pointer off-surface so nothing is revealed.
    pub fn clear_pointer(&mut self) {
        self.x = OFF_SURFACE;
        self.y = OFF_SURFACE;
    }

    pub fn pointer(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn is_cleared(&self) -> bool {
        self.x == OFF_SURFACE && self.y == OFF_SURFACE
    }

    /// Mask alpha at a local point, in [0, 1].
    pub fn mask_at(&self, x: f32, y: f32) -> f32 {
        if self.is_cleared() || self.radius <= 0.0 {
            return 0.0;
        }
        let d = ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt();
        (1.0 - d / self.radius).clamp(0.0, 1.0)
    }

    /// CSS `mask-image` value.
    pub fn css_mask(&self) -> String {
        format!(
            "radial-gradient({}px circle at {}px {}px, black, transparent)",
            self.radius, self.x, self.y
        )
    }

    /// Same mask as a canvas paint, for `destination-in` style compositing.
    pub fn mask_paint(&self) -> Paint {
        Paint::Radial {
            center: [self.x, self.y],
            inner: 0.0,
            outer: self.radius,
            stops: vec![
                GradientStop::new(0.0, Rgba::BLACK),
                GradientStop::new(1.0, Rgba::BLACK.with_alpha(0.0)),
            ],
        }
    }

    /// Write the mask onto a retained node.
    pub fn apply(&self, host: &mut dyn NodeHost, node: NodeId) {
        let mask = self.css_mask();
        host.set_attr(node, "style.webkitMaskImage", mask.clone());
        host.set_attr(node, "style.maskImage", mask);
    }
}

/// Default length of a wipe.
pub const WIPE_DURATION_MS: f64 = 1200.0;

/// Mask radius at full progress, in percent of the element.
const WIPE_REACH_PCT: f32 = 150.0;

/// One sample of a running wipe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WipeFrame {
    /// Eased progress in [0, 1].
    pub progress: f32,
    /// True on exactly one sample: the first with raw progress past one half.
    pub midpoint: bool,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WipeRun {
    origin: (f32, f32),
    started: Timestamp,
    midpoint_fired: bool,
}

/// Circular wipe grown from a click point over a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialWipe {
    duration_ms: f64,
    run: Option<WipeRun>,
    progress: f32,
}

impl RadialWipe {
    pub fn new(duration_ms: f64) -> Self {
        RadialWipe {
            duration_ms: if duration_ms.is_finite() && duration_ms > 0.0 {
                duration_ms
            } else {
                WIPE_DURATION_MS
            },
            run: None,
            progress: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    /// Start a wipe at (x, y). Ignored while one is running.
    pub fn start(&mut self, x: f32, y: f32, now: Timestamp) -> bool {
        if self.run.is_some() {
            log::debug!("radial wipe already running; ignoring start");
            return false;
        }
        self.run = Some(WipeRun {
            origin: (x, y),
            started: now,
            midpoint_fired: false,
        });
        self.progress = 0.0;
        true
    }

    /// Advance to `now`. Returns `None` when idle.
    pub fn sample(&mut self, now: Timestamp) -> Option<WipeFrame> {
        let run = self.run.as_mut()?;
        let elapsed = now.as_millis() - run.started.as_millis();
        let raw = (elapsed / self.duration_ms).clamp(0.0, 1.0) as f32;
        let midpoint = raw > 0.5 && !run.midpoint_fired;
        if midpoint {
            run.midpoint_fired = true;
        }
        self.progress = ease_in_out(raw);
        let finished = raw >= 1.0;
        if finished {
            self.run = None;
        }
        Some(WipeFrame {
            progress: self.progress,
            midpoint,
            finished,
        })
    }

    /// CSS `mask-image` for the current progress; `None` when idle.
    pub fn css_mask(&self) -> Option<String> {
        let run = self.run.as_ref()?;
        let edge = self.progress * WIPE_REACH_PCT;
        Some(format!(
            "radial-gradient(circle at {}px {}px, black {edge}%, transparent {edge}%)",
            run.origin.0, run.origin.1
        ))
    }
}

impl Default for RadialWipe {
    fn default() -> Self {
        RadialWipe::new(WIPE_DURATION_MS)
    }
}
