// Easing curves and interpolation helpers shared by the engines.

use serde::{Deserialize, Serialize};

/// Easing function for eased parameters in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    #[default]
    Linear,
    EaseOut,
    /// Symmetric quadratic in-out.
    EaseInOut,
    /// Symmetric cubic in-out.
    EaseInOutCubic,
}

impl EasingType {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingType::Linear => t,
            EasingType::EaseOut => 1.0 - (1.0 - t).powi(3),
            EasingType::EaseInOut => ease_in_out(t),
            EasingType::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Quadratic ease-in-out; symmetric about t = 0.5.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear keyframe lookup over `(offset, value)` pairs sorted by offset.
pub fn keyframes(points: &[(f32, f32)], t: f32) -> f32 {
    match points {
        [] => 0.0,
        [only] => only.1,
        [first, ..] if t <= first.0 => first.1,
        _ => {
            for pair in points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if t <= b.0 {
                    let span = b.0 - a.0;
                    if span <= 0.0 {
                        return b.1;
                    }
                    return lerp(a.1, b.1, (t - a.0) / span);
                }
            }
            points[points.len() - 1].1
        }
    }
}
