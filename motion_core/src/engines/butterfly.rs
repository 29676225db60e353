// Butterflies from compounded rotating frames: cluster drift, radial orbit,
// squashed oval spin, upright counter-rotation and wing flap. Each frame
// multiplies onto its parent; periods are chosen with no low common multiple.

use glam::{Affine2, Vec2};
use std::f32::consts::TAU;

use crate::clock::FrameTime;
use crate::config::{ButterflySettings, ButterflyUnit};
use crate::controller::Simulation;
use crate::easing::{ease_in_out, lerp};
use crate::nodes::NodeHost;
use crate::surface::{DrawCommand, Surface};
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

/// Drift path of the whole cluster, in unscaled pixels.
const DRIFT: [Vec2; 5] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(100.0, 0.0),
    Vec2::new(30.0, -70.0),
    Vec2::new(0.0, 20.0),
    Vec2::new(-100.0, -50.0),
];

const FLAP_ANGLE: f32 = 40.0 * TAU / 360.0;
const CLUSTER_ALPHA: f32 = 0.9;

/// Fraction of a cycle completed at time `t`.
fn cycle(t: f64, period: f32) -> f32 {
    if period <= 0.0 {
        return 0.0;
    }
    (t / period as f64).fract() as f32
}

/// 0 → 1 → 0 over one cycle.
fn there_and_back(u: f32) -> f32 {
    if u < 0.5 {
        u * 2.0
    } else {
        2.0 - u * 2.0
    }
}

/// Cluster offset: eased keyframe walk, played backwards first and then forwards.
pub fn drift_offset(t: f64, period: f32) -> Vec2 {
    let s = 1.0 - there_and_back(cycle(t, period));
    let span = (DRIFT.len() - 1) as f32;
    let pos = s * span;
    let i = (pos.floor() as usize).min(DRIFT.len() - 2);
    DRIFT[i].lerp(DRIFT[i + 1], ease_in_out(pos - i as f32))
}

/// Wing transform: scale(1, 1.2) rotate(40°) swinging to scale(0.7, -1) rotate(-40°).
fn flap(t: f64, period: f32) -> Affine2 {
    let e = ease_in_out(there_and_back(cycle(t, period)));
    Affine2::from_scale(Vec2::new(lerp(1.0, 0.7, e), lerp(1.2, -1.0, e)))
        * Affine2::from_angle(lerp(FLAP_ANGLE, -FLAP_ANGLE, e))
}

/// True when `a / b` lies within `tol` of some p/q with q ≤ `max_den`.
pub fn near_low_ratio(a: f32, b: f32, max_den: u32, tol: f32) -> bool {
    let r = a / b;
    (1..=max_den).any(|q| {
        let p = (r * q as f32).round();
        p > 0.0 && (r - p / q as f32).abs() < tol
    })
}

pub struct Butterflies {
    settings: ButterflySettings,
    center: Vec2,
    /// Seconds since activation; f64 so phases stay exact over long sessions.
    time: f64,
}

impl Butterflies {
    /// Every period that feeds the composite motion.
    pub fn periods(&self) -> Vec<f32> {
        let mut out = vec![self.settings.drift_period];
        for unit in &self.settings.units {
            out.extend([unit.radial_period, unit.spin_period, unit.flap_period]);
        }
        out
    }

    /// Full transform of one butterfly's wing frame at time `t`.
    pub fn unit_transform(&self, unit: &ButterflyUnit, t: f64) -> Affine2 {
        let s = &self.settings;
        let radial = cycle(t, unit.radial_period) * TAU;
        let spin = cycle(t, unit.spin_period) * TAU;

        let cluster = Affine2::from_translation(self.center)
            * Affine2::from_scale(Vec2::splat(s.cluster_scale))
            * Affine2::from_translation(drift_offset(t, s.drift_period));
        let orbit = Affine2::from_angle(radial)
            * Affine2::from_scale(Vec2::new(s.squish, 1.0))
            * Affine2::from_angle(spin);
        let oval = Affine2::from_translation(Vec2::new(s.orbit_offset, 0.0))
            * Affine2::from_angle(-spin)
            * Affine2::from_scale(Vec2::new(s.oval_stretch, 1.0));
        let upright = Affine2::from_angle(-radial);

        cluster * orbit * oval * upright * flap(t, unit.flap_period)
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl Simulation for Butterflies {
    type Config = ButterflySettings;
    const KIND: EngineKind = EngineKind::Butterflies;

    fn build(config: &ButterflySettings, viewport: &Viewport) -> Self {
        for (i, a) in config.units.iter().enumerate() {
            for b in &config.units[i + 1..] {
                if near_low_ratio(a.radial_period, b.radial_period, 12, 1e-3) {
                    log::warn!(
                        "butterflies: radial periods {} and {} share a short cycle",
                        a.radial_period,
                        b.radial_period
                    );
                }
            }
        }
        Butterflies {
            settings: config.clone(),
            center: viewport.center(),
            time: 0.0,
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.center = viewport.center();
    }

    fn step(&mut self, frame: &FrameTime, _signals: &SignalBundle) {
        self.time += frame.dt as f64;
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        surface.clear();
        surface.shadow(5.0, Rgba::ACCENT.with_alpha(0.4));
        let wing = Rgba::WHITE.with_alpha(0.9 * CLUSTER_ALPHA);
        for unit in &self.settings.units {
            let m = self.unit_transform(unit, self.time);
            surface.submit(DrawCommand::SetTransform {
                matrix: m.to_cols_array(),
            });
            // Fore and hind wing, in a 25 x 20 px box centred on the frame origin.
            surface.fill_ellipse(0.0, -5.0, 5.6, 3.5, 0.0, wing.into());
            surface.fill_ellipse(0.0, 4.0, 6.25, 3.5, 0.0, wing.into());
        }
        surface.submit(DrawCommand::ResetTransform);
        surface.shadow(0.0, Rgba::ACCENT.with_alpha(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeRegistry;
    use crate::surface::DisplayList;

    fn butterflies() -> Butterflies {
        Butterflies::build(&ButterflySettings::default(), &Viewport::new(1000.0, 800.0, 1.0))
    }

    #[test]
    fn default_periods_are_not_commensurate() {
        let b = butterflies();
        let periods = b.periods();
        for (i, a) in periods.iter().enumerate() {
            for c in &periods[i + 1..] {
                assert!(
                    !near_low_ratio(*a, *c, 12, 1e-3),
                    "{a} and {c} share a short common cycle"
                );
            }
        }
    }

    #[test]
    fn low_ratios_are_detected() {
        assert!(near_low_ratio(10.0, 15.0, 12, 1e-3));
        assert!(near_low_ratio(1.2, 1.2, 12, 1e-3));
        assert!(!near_low_ratio(10.3, 15.7, 12, 1e-3));
    }

    #[test]
    fn composite_does_not_repeat_on_component_periods() {
        let b = butterflies();
        let unit = b.settings.units[0];
        let t = 3.7;
        let base = b.unit_transform(&unit, t);
        for p in b.periods() {
            let later = b.unit_transform(&unit, t + p as f64);
            assert!(
                (later.translation - base.translation).length() > 1e-2,
                "composite repeats after {p}s"
            );
        }
    }

    #[test]
    fn drift_walks_the_keyframes() {
        assert_eq!(drift_offset(0.0, 25.4), DRIFT[4]);
        let mid = drift_offset(12.7, 25.4);
        assert!(mid.distance(DRIFT[0]) < 1e-3);
    }

    #[test]
    fn renders_one_transform_per_unit() {
        let b = butterflies();
        let mut list = DisplayList::new();
        let mut nodes = NodeRegistry::new();
        b.render(Some(&mut list), &mut nodes);
        let cmds = list.take_commands();
        let transforms = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::SetTransform { .. }))
            .count();
        assert_eq!(transforms, 2);
        assert!(cmds.iter().any(|c| matches!(c, DrawCommand::ResetTransform)));
        for cmd in &cmds {
            if let DrawCommand::SetTransform { matrix } = cmd {
                assert!(matrix.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn time_accumulates_without_wrapping() {
        let mut b = butterflies();
        for _ in 0..600 {
            b.step(&FrameTime::fixed(0.1, 0.0), &SignalBundle::default());
        }
        assert!((b.time() - 60.0).abs() < 1e-3);
    }
}
