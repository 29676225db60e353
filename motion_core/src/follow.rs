// Pointer followers: a position that chases a pointer-derived target every
// frame, either by a fixed fraction per frame or by a damped spring per axis.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::clock::NOMINAL_DT;
use crate::spring::Spring;
use crate::types::Viewport;

/// How a follower closes the gap to its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FollowMode {
    /// Cover `factor` of the remaining distance per nominal 60Hz frame.
    Lerp { factor: f32 },
    Spring {
        stiffness: f32,
        damping: f32,
        mass: f32,
    },
}

impl FollowMode {
    /// Cursor ring trailing the pointer.
    pub const TRAILER: FollowMode = FollowMode::Lerp { factor: 0.35 };
    /// Slow hero-backdrop parallax.
    pub const PARALLAX: FollowMode = FollowMode::Spring {
        stiffness: 15.0,
        damping: 45.0,
        mass: 1.0,
    };
    /// Quick, light pull of a button toward the pointer.
    pub const MAGNETIC: FollowMode = FollowMode::Spring {
        stiffness: 150.0,
        damping: 15.0,
        mass: 0.1,
    };
}

impl Default for FollowMode {
    fn default() -> Self {
        FollowMode::TRAILER
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Chase {
    Lerp { factor: f32 },
    Spring { x: Spring, y: Spring },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerFollower {
    chase: Chase,
    target: Vec2,
    position: Vec2,
}

impl PointerFollower {
    /// Follower resting at `start`, with its target there too.
    pub fn new(mode: FollowMode, start: Vec2) -> Self {
        let chase = match mode {
            FollowMode::Lerp { factor } => Chase::Lerp {
                factor: if factor.is_finite() { factor.clamp(0.0, 1.0) } else { 1.0 },
            },
            FollowMode::Spring {
                stiffness,
                damping,
                mass,
            } => {
                let mut x = Spring::with_mass(stiffness, damping, mass);
                let mut y = x;
                x.snap_to(start.x);
                y.snap_to(start.y);
                Chase::Spring { x, y }
            }
        };
        PointerFollower {
            chase,
            target: start,
            position: start,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Non-finite targets are ignored.
    pub fn set_target(&mut self, target: Vec2) {
        if target.is_finite() {
            self.target = target;
        }
    }

    /// Jump to `position` at rest, target included.
    pub fn snap(&mut self, position: Vec2) {
        if !position.is_finite() {
            return;
        }
        self.target = position;
        self.position = position;
        if let Chase::Spring { x, y } = &mut self.chase {
            x.snap_to(position.x);
            y.snap_to(position.y);
        }
    }

    /// Advance by `dt` seconds. The per-frame lerp is rescaled so that two
    /// half frames land where one full frame would.
    pub fn step(&mut self, dt: f32) -> Vec2 {
        if !(dt > 0.0) {
            return self.position;
        }
        match &mut self.chase {
            Chase::Lerp { factor } => {
                let keep = (1.0 - *factor).powf(dt / NOMINAL_DT);
                self.position = self.target + (self.position - self.target) * keep;
            }
            Chase::Spring { x, y } => {
                self.position = Vec2::new(x.update(self.target.x, dt), y.update(self.target.y, dt));
            }
        }
        self.position
    }

    pub fn is_settled(&self, tolerance: f32) -> bool {
        self.position.distance(self.target) <= tolerance
    }
}

/// Backdrop offset for a pointer anywhere in the viewport: zero at the
/// centre, `range / 2` at the edges, moving against the pointer.
pub fn parallax_target(pointer: Vec2, viewport: &Viewport, range: f32) -> Vec2 {
    if viewport.is_empty() {
        return Vec2::ZERO;
    }
    let size = Vec2::new(viewport.width, viewport.height);
    (pointer / size - 0.5) * -range
}

/// Offset pulling an element toward the pointer by `pull` of the distance
/// from its centre.
pub fn magnetic_target(pointer: Vec2, center: Vec2, pull: f32) -> Vec2 {
    (pointer - center) * pull
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trailer_covers_its_factor_each_frame() {
        let mut f = PointerFollower::new(FollowMode::TRAILER, Vec2::ZERO);
        f.set_target(Vec2::new(100.0, -40.0));
        let p = f.step(NOMINAL_DT);
        assert!((p.x - 35.0).abs() < 1e-3);
        assert!((p.y + 14.0).abs() < 1e-3);
    }

    #[test]
    fn trailer_is_frame_rate_independent() {
        let mut once = PointerFollower::new(FollowMode::TRAILER, Vec2::ZERO);
        let mut twice = once;
        once.set_target(Vec2::splat(100.0));
        twice.set_target(Vec2::splat(100.0));
        once.step(NOMINAL_DT);
        twice.step(NOMINAL_DT / 2.0);
        twice.step(NOMINAL_DT / 2.0);
        assert!(once.position().distance(twice.position()) < 1e-3);
    }

    #[test]
    fn magnetic_pull_settles_quickly() {
        let mut f = PointerFollower::new(FollowMode::MAGNETIC, Vec2::ZERO);
        f.set_target(magnetic_target(Vec2::new(160.0, 50.0), Vec2::new(100.0, 50.0), 0.3));
        assert_eq!(f.target(), Vec2::new(18.0, 0.0));
        for _ in 0..60 {
            f.step(NOMINAL_DT);
        }
        assert!(f.is_settled(0.01));
    }

    #[test]
    fn parallax_is_slow_and_opposes_the_pointer() {
        let vp = Viewport::new(1000.0, 800.0, 1.0);
        assert_eq!(parallax_target(Vec2::new(500.0, 400.0), &vp, 20.0), Vec2::ZERO);
        let target = parallax_target(Vec2::new(1000.0, 0.0), &vp, 20.0);
        assert_eq!(target, Vec2::new(-10.0, 10.0));

        let mut f = PointerFollower::new(FollowMode::PARALLAX, Vec2::ZERO);
        f.set_target(target);
        f.step(0.5);
        assert!(f.position().x < 0.0 && f.position().x > -5.0);
    }

    #[test]
    fn snap_clears_spring_motion() {
        let mut f = PointerFollower::new(FollowMode::MAGNETIC, Vec2::ZERO);
        f.set_target(Vec2::splat(50.0));
        f.step(0.05);
        f.snap(Vec2::new(3.0, 4.0));
        assert_eq!(f.step(0.05), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn bad_input_is_ignored() {
        let mut f = PointerFollower::new(FollowMode::TRAILER, Vec2::ONE);
        f.set_target(Vec2::new(f32::NAN, 0.0));
        assert_eq!(f.target(), Vec2::ONE);
        assert_eq!(f.step(-1.0), Vec2::ONE);
    }

    proptest! {
        #[test]
        fn trailer_never_overshoots(tx in -2000.0f32..2000.0, ty in -2000.0f32..2000.0, dts in prop::collection::vec(0.0f32..0.1, 1..40)) {
            let target = Vec2::new(tx, ty);
            let mut f = PointerFollower::new(FollowMode::TRAILER, Vec2::ZERO);
            f.set_target(target);
            let mut gap = target.length();
            for dt in dts {
                let next = f.step(dt).distance(target);
                prop_assert!(next <= gap + 1e-3);
                gap = next;
            }
        }
    }
}
