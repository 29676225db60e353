// Ray-casting aurora curtain: per-column layered sine noise drawn as gradient strips.
// Scroll velocity is spring-smoothed and the phase boost is clamped so a flung scroll cannot strobe.

use std::f32::consts::PI;

use crate::clock::FrameTime;
use crate::config::AuroraSettings;
use crate::controller::Simulation;
use crate::nodes::NodeHost;
use crate::spring::Spring;
use crate::surface::{GradientStop, Paint, Surface};
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

/// Thirteen saturated hues (h, s, l). Layer `l` uses entry `l % 13`.
const PALETTE: [(f32, f32, f32); 13] = [
    (142.0, 95.0, 55.0),
    (175.0, 100.0, 50.0),
    (260.0, 90.0, 60.0),
    (210.0, 100.0, 55.0),
    (300.0, 95.0, 50.0),
    (330.0, 100.0, 60.0),
    (25.0, 100.0, 55.0),
    (50.0, 100.0, 50.0),
    (280.0, 85.0, 55.0),
    (160.0, 100.0, 45.0),
    (190.0, 90.0, 50.0),
    (270.0, 95.0, 65.0),
    (10.0, 100.0, 50.0),
];

/// Every time coefficient in `noise` is a multiple of 0.025, so the field is
/// periodic in time with period 2π / 0.025. Folding the phase accumulator by
/// this is invisible.
pub const PHASE_PERIOD: f32 = 2.0 * PI / 0.025;

/// Spatial/temporal parameters of one depth layer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layer {
    color: Rgba,
    freq: f32,
    speed: f32,
    offset: f32,
    alpha_falloff: f32,
}

impl Layer {
    fn new(index: u32) -> Self {
        let (h, s, l) = PALETTE[index as usize % PALETTE.len()];
        let i = index as f32;
        Layer {
            color: Rgba::from_hsl(h, s, l),
            freq: (0.003 - i * 0.0004).max(0.0002),
            speed: (i + 1.0) * 1.5,
            offset: (i * 5000.0).rem_euclid(2.0 * PI),
            alpha_falloff: 1.0 / (i * 0.5 + 1.0),
        }
    }

    /// Normalized noise in [0, 1] for column x at phase `time`.
    fn noise(&self, x: f32, time: f32) -> f32 {
        let raw = (x * self.freq + time * (self.speed * 0.2) + self.offset).sin()
            + (x * (self.freq * 2.8) - time * (self.speed * 0.15)).sin() * 0.6
            + (x * 0.01 + time * 0.5).cos() * 0.2;
        ((raw + 1.8) / 3.6).clamp(0.0, 1.0)
    }
}

pub struct Aurora {
    settings: AuroraSettings,
    layers: Vec<Layer>,
    velocity: Spring,
    boost: f32,
    time: f32,
    size: (f32, f32),
}

impl Aurora {
    /// Current scroll-derived phase boost per nominal frame.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    pub fn phase(&self) -> f32 {
        self.time
    }

    fn columns(&self) -> u32 {
        if self.settings.ray_width <= 0.0 {
            return 0;
        }
        (self.size.0 / self.settings.ray_width).ceil() as u32
    }
}

impl Simulation for Aurora {
    type Config = AuroraSettings;
    const KIND: EngineKind = EngineKind::Aurora;

    fn build(config: &AuroraSettings, viewport: &Viewport) -> Self {
        Aurora {
            settings: config.clone(),
            layers: (0..config.layers).map(Layer::new).collect(),
            velocity: Spring::critical(config.spring_stiffness),
            boost: 0.0,
            time: 0.0,
            size: (viewport.width, viewport.height),
        }
    }

    fn resolution_scale(&self) -> f32 {
        self.settings.resolution_scale
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.size = (viewport.width, viewport.height);
    }

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle) {
        let smoothed = self.velocity.update(signals.scroll_velocity, frame.dt);
        self.boost = (smoothed.abs() * self.settings.boost_gain).min(self.settings.boost_max);
        self.time += self.settings.base_speed * frame.dt + self.boost * frame.frames();
        if self.time >= PHASE_PERIOD {
            self.time %= PHASE_PERIOD;
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        surface.clear();

        let h = self.size.1 * self.settings.height_fraction;
        let w = self.settings.ray_width;
        let columns = self.columns();
        for layer in &self.layers {
            for i in 0..columns {
                let x = i as f32 * w;
                let n = layer.noise(x, self.time);
                if n <= self.settings.threshold {
                    continue;
                }
                let height = n * h;
                let alpha = n.powi(self.settings.peak_power) * self.settings.base_alpha * layer.alpha_falloff;
                let paint = Paint::Linear {
                    from: [x, 0.0],
                    to: [x, height],
                    stops: vec![
                        GradientStop::new(0.0, layer.color.with_alpha(0.0)),
                        GradientStop::new(0.15, layer.color.with_alpha(alpha)),
                        GradientStop::new(1.0, layer.color.with_alpha(0.0)),
                    ],
                };
                surface.fill_rect(x, 0.0, w, height, paint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DisplayList, DrawCommand};
    use proptest::prelude::*;

    fn aurora() -> Aurora {
        Aurora::build(&AuroraSettings::default(), &Viewport::new(1200.0, 800.0, 1.0))
    }

    fn step(a: &mut Aurora, velocity: f32) {
        let signals = SignalBundle {
            scroll_velocity: velocity,
            ..Default::default()
        };
        a.step(&FrameTime::fixed(1.0 / 60.0, 0.0), &signals);
    }

    #[test]
    fn scroll_spike_never_exceeds_boost_ceiling() {
        let mut a = aurora();
        step(&mut a, 5.0e7);
        assert!(a.boost() <= 0.04 + 1e-7);
        for _ in 0..300 {
            step(&mut a, 0.0);
            assert!(a.boost() <= 0.04 + 1e-7);
        }
        assert!(a.boost() < 0.001);
    }

    #[test]
    fn noise_is_periodic_in_phase() {
        let layer = Layer::new(3);
        for x in [0.0, 120.0, 733.0] {
            let a = layer.noise(x, 1.25);
            let b = layer.noise(x, 1.25 + PHASE_PERIOD);
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn phase_is_folded() {
        let mut a = aurora();
        a.time = PHASE_PERIOD - 0.001;
        step(&mut a, 0.0);
        assert!(a.phase() < PHASE_PERIOD);
        assert!(a.phase() >= 0.0);
    }

    #[test]
    fn strips_stay_inside_the_curtain_band() {
        let mut a = aurora();
        step(&mut a, 0.0);
        let mut list = DisplayList::new();
        let mut nodes = crate::nodes::NodeRegistry::new();
        a.render(Some(&mut list), &mut nodes);
        let cmds = list.take_commands();
        assert!(matches!(cmds[0], DrawCommand::Clear));
        assert!(cmds.len() > 1);
        for cmd in &cmds[1..] {
            match cmd {
                DrawCommand::Rect { h, w, .. } => {
                    assert!(*h <= 800.0 * 0.7 + 1e-3);
                    assert_eq!(*w, 12.0);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    proptest! {
        #[test]
        fn boost_is_bounded_for_any_input(samples in prop::collection::vec(-1.0e9f32..1.0e9, 1..40)) {
            let mut a = aurora();
            for v in samples {
                step(&mut a, v);
                prop_assert!(a.boost() >= 0.0);
                prop_assert!(a.boost() <= 0.04 + 1e-7);
            }
        }
    }
}
