// Firefly swarm: eased waypoint travel plus an orbit around the anchor.
// Every fly runs its own dwell/rise/fall flash cycle; nothing is synchronized.

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::FireflySettings;
use crate::controller::Simulation;
use crate::easing::{ease_in_out, lerp};
use crate::nodes::NodeHost;
use crate::surface::Surface;
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

const SHADOW: Rgba = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 0.3,
};

/// Offset from the surface centre in percent of each axis, plus a size scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub offset: Vec2,
    pub scale: f32,
}

/// Fixed-length cyclic path.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    points: Vec<Waypoint>,
}

impl WaypointPath {
    /// `None` for an empty list.
    pub fn new(points: Vec<Waypoint>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(WaypointPath { points })
    }

    fn random(rng: &mut fastrand::Rng, len: usize) -> Self {
        let points = (0..len.max(1))
            .map(|_| Waypoint {
                offset: Vec2::new(rng.f32() * 100.0 - 50.0, rng.f32() * 100.0 - 50.0),
                scale: rng.f32() * 0.75 + 0.25,
            })
            .collect();
        WaypointPath { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Interpolated waypoint between `index` and its successor.
    pub fn sample(&self, cursor: &PathCursor) -> Waypoint {
        let a = self.points[cursor.index % self.len()];
        let b = self.points[(cursor.index + 1) % self.len()];
        let t = ease_in_out(cursor.progress);
        Waypoint {
            offset: a.offset.lerp(b.offset, t),
            scale: lerp(a.scale, b.scale, t),
        }
    }
}

/// Position along a WaypointPath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCursor {
    pub index: usize,
    /// Eased-parameter input, in [0, 1).
    pub progress: f32,
}

impl PathCursor {
    /// Advance by `delta` segments. Overflow carries into the next segment
    /// so a full loop lands exactly where it started.
    pub fn advance(&mut self, delta: f32, len: usize) {
        if !(delta > 0.0) || len == 0 {
            return;
        }
        self.progress += delta;
        while self.progress >= 1.0 {
            self.progress -= 1.0;
            self.index = (self.index + 1) % len;
        }
    }
}

/// Dwell, then a rise/fall opacity pulse, then a fresh random dwell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashCycle {
    progress: f32,
    /// Cycles per second.
    rate: f32,
    delay_ms: f32,
    opacity: f32,
}

impl FlashCycle {
    fn advance(&mut self, dt: f32, rng: &mut fastrand::Rng, settings: &FireflySettings) {
        if self.delay_ms > 0.0 {
            self.delay_ms -= dt * 1000.0;
            self.opacity = 0.0;
            return;
        }
        self.progress += self.rate * dt;
        if self.progress >= 1.0 {
            self.progress = 0.0;
            self.delay_ms = range(rng, settings.redelay_ms);
        }
        self.opacity = pulse(self.progress, settings.rise, settings.fall_end);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}

/// Opacity at cycle fraction `t`: linear rise to 1 at `rise`, linear fall to
/// 0 at `fall_end`, dark afterwards.
pub fn pulse(t: f32, rise: f32, fall_end: f32) -> f32 {
    if t < rise {
        t / rise
    } else if t < fall_end {
        1.0 - (t - rise) / (fall_end - rise)
    } else {
        0.0
    }
}

fn range(rng: &mut fastrand::Rng, (lo, hi): (f32, f32)) -> f32 {
    lo + rng.f32() * (hi - lo)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Firefly {
    path: WaypointPath,
    cursor: PathCursor,
    /// Segments per second.
    move_speed: f32,
    orbit_angle: f32,
    /// Radians per second.
    orbit_speed: f32,
    flash: FlashCycle,
}

impl Firefly {
    fn spawn(rng: &mut fastrand::Rng, settings: &FireflySettings) -> Self {
        Firefly {
            path: WaypointPath::random(rng, settings.waypoints as usize),
            cursor: PathCursor {
                index: 0,
                progress: rng.f32(),
            },
            move_speed: range(rng, settings.move_speed),
            orbit_angle: rng.f32() * std::f32::consts::TAU,
            orbit_speed: range(rng, settings.orbit_speed),
            flash: FlashCycle {
                progress: 0.0,
                rate: range(rng, settings.flash_rate),
                delay_ms: range(rng, settings.initial_delay_ms),
                opacity: 0.0,
            },
        }
    }

    /// Anchor on the path, in surface pixels.
    fn anchor(&self, size: Vec2) -> (Vec2, f32) {
        let w = self.path.sample(&self.cursor);
        (size * 0.5 + w.offset * size / 100.0, w.scale)
    }

    fn position(&self, size: Vec2, orbit_radius: f32) -> Vec2 {
        self.anchor(size).0 + Vec2::from_angle(self.orbit_angle) * orbit_radius
    }

    pub fn opacity(&self) -> f32 {
        self.flash.opacity()
    }
}

pub struct Fireflies {
    settings: FireflySettings,
    rng: fastrand::Rng,
    flies: Vec<Firefly>,
    size: Vec2,
}

impl Fireflies {
    pub fn flies(&self) -> &[Firefly] {
        &self.flies
    }

    pub fn orbit_radius(&self) -> f32 {
        self.size.x * self.settings.orbit_radius_fraction
    }

    fn base_size(&self) -> f32 {
        (self.size.x * self.settings.size_fraction).max(self.settings.min_size)
    }

    pub fn positions(&self) -> Vec<Vec2> {
        let r = self.orbit_radius();
        self.flies.iter().map(|f| f.position(self.size, r)).collect()
    }
}

impl Simulation for Fireflies {
    type Config = FireflySettings;
    const KIND: EngineKind = EngineKind::Fireflies;

    fn build(config: &FireflySettings, viewport: &Viewport) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let flies = (0..config.count).map(|_| Firefly::spawn(&mut rng, config)).collect();
        Fireflies {
            settings: config.clone(),
            rng,
            flies,
            size: Vec2::new(viewport.width, viewport.height),
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.size = Vec2::new(viewport.width, viewport.height);
    }

    fn step(&mut self, frame: &FrameTime, _signals: &SignalBundle) {
        let dt = frame.dt;
        for fly in &mut self.flies {
            let len = fly.path.len();
            fly.cursor.advance(fly.move_speed * dt, len);
            fly.orbit_angle = (fly.orbit_angle + fly.orbit_speed * dt) % std::f32::consts::TAU;
            fly.flash.advance(dt, &mut self.rng, &self.settings);
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return;
        }
        surface.clear();

        let radius = self.orbit_radius();
        let base = self.base_size();
        for fly in &self.flies {
            let (_, scale) = fly.anchor(self.size);
            let at = fly.position(self.size, radius);
            let size = base * scale;
            surface.fill_circle(at.x, at.y, size / 2.0, SHADOW.into());

            let opacity = fly.opacity();
            if opacity > 0.0 {
                surface.fill_circle(at.x, at.y, size / 2.0, Rgba::WHITE.with_alpha(opacity).into());
                surface.fill_circle(at.x, at.y, size / 3.0, Rgba::ACCENT.with_alpha(opacity * 0.8).into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square_path() -> WaypointPath {
        let wp = |x: f32, y: f32, scale: f32| Waypoint {
            offset: Vec2::new(x, y),
            scale,
        };
        WaypointPath::new(vec![
            wp(-40.0, -40.0, 0.25),
            wp(40.0, -40.0, 0.5),
            wp(40.0, 40.0, 0.75),
            wp(-40.0, 40.0, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn one_full_loop_returns_to_start() {
        let path = square_path();
        let mut cursor = PathCursor {
            index: 0,
            progress: 0.0,
        };
        let start = path.sample(&cursor);
        // 4 segments at 0.5 segments/s is an 8 s loop.
        for _ in 0..32 {
            cursor.advance(0.5 * 0.25, path.len());
        }
        assert_eq!(cursor.index, 0);
        assert_eq!(path.sample(&cursor), start);
    }

    #[test]
    fn pulse_shape() {
        assert_eq!(pulse(0.0, 0.05, 0.3), 0.0);
        assert!((pulse(0.05, 0.05, 0.3) - 1.0).abs() < 1e-6);
        assert!((pulse(0.175, 0.05, 0.3) - 0.5).abs() < 1e-5);
        assert_eq!(pulse(0.5, 0.05, 0.3), 0.0);
    }

    fn swarm(count: u32) -> Fireflies {
        let settings = FireflySettings {
            count,
            ..FireflySettings::default()
        };
        Fireflies::build(&settings, &Viewport::new(1000.0, 600.0, 1.0))
    }

    #[test]
    fn flash_cycles_are_decoupled() {
        let mut s = swarm(10);
        let mut traces = vec![Vec::new(); 10];
        let mut positions_ok = true;
        let margin = s.orbit_radius() + 1.0;
        for _ in 0..1000 {
            s.step(&FrameTime::fixed(1.0 / 60.0, 0.0), &SignalBundle::default());
            for (trace, fly) in traces.iter_mut().zip(s.flies()) {
                let o = fly.opacity();
                assert!(o.is_finite() && (0.0..=1.0).contains(&o));
                trace.push(o);
            }
            for p in s.positions() {
                positions_ok &= p.is_finite()
                    && p.x >= -margin
                    && p.x <= 1000.0 + margin
                    && p.y >= -margin
                    && p.y <= 600.0 + margin;
            }
        }
        assert!(positions_ok);
        for trace in &traces {
            assert!(trace.iter().any(|o| *o > 0.0), "a fly never flashed");
        }
        for i in 0..traces.len() {
            for j in i + 1..traces.len() {
                assert_ne!(traces[i], traces[j], "flies {i} and {j} flash in lockstep");
            }
        }
    }

    #[test]
    fn same_seed_same_swarm() {
        assert_eq!(swarm(12).flies(), swarm(12).flies());
    }

    #[test]
    fn render_draws_shadow_dot_per_fly() {
        let s = swarm(5);
        let mut list = crate::surface::DisplayList::new();
        let mut nodes = crate::nodes::NodeRegistry::new();
        s.render(Some(&mut list), &mut nodes);
        // clear + one shadow dot each, nobody flashes before the first step
        assert_eq!(list.commands().len(), 6);
    }

    proptest! {
        #[test]
        fn loop_closure_for_any_path(
            seed in any::<u64>(),
            len in 2usize..24,
            start in 0.0f32..0.99,
            steps in 8usize..200,
        ) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let path = WaypointPath::random(&mut rng, len);
            let mut cursor = PathCursor { index: 0, progress: start };
            let before = path.sample(&cursor);
            let delta = len as f32 / steps as f32;
            for _ in 0..steps {
                cursor.advance(delta, len);
            }
            let after = path.sample(&cursor);
            prop_assert!(before.offset.distance(after.offset) < 0.05);
            prop_assert!((before.scale - after.scale).abs() < 1e-3);
        }
    }
}
