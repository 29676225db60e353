// Perspective starfield. Stars fall towards the viewer and respawn at max depth;
// hovering the host element switches to warp speed with streaks.
// Frames are composited over a translucent wash, never fully cleared.

use glam::{Vec2, Vec3};

use crate::clock::FrameTime;
use crate::config::StarfieldSettings;
use crate::controller::Simulation;
use crate::nodes::NodeHost;
use crate::surface::Surface;
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

const TRAIL: Rgba = Rgba::rgb(5, 5, 5);

pub struct Starfield {
    settings: StarfieldSettings,
    rng: fastrand::Rng,
    stars: Vec<Vec3>,
    size: Vec2,
    warp: bool,
}

impl Starfield {
    fn spawn(rng: &mut fastrand::Rng, size: Vec2, z: f32) -> Vec3 {
        Vec3::new(
            (rng.f32() - 0.5) * size.x * 2.0,
            (rng.f32() - 0.5) * size.y * 2.0,
            z,
        )
    }

    pub fn stars(&self) -> &[Vec3] {
        &self.stars
    }

    pub fn is_warping(&self) -> bool {
        self.warp
    }

    /// Screen position of a star at depth `z`.
    pub fn project(&self, star: Vec3, z: f32) -> Vec2 {
        let k = self.settings.focal_length;
        Vec2::new(star.x, star.y) / z * k + self.size * 0.5
    }

    /// 0 at max depth, 1 at the eye.
    fn closeness(&self, z: f32) -> f32 {
        (1.0 - z / self.settings.max_depth).clamp(0.0, 1.0)
    }
}

impl Simulation for Starfield {
    type Config = StarfieldSettings;
    const KIND: EngineKind = EngineKind::Starfield;

    fn build(config: &StarfieldSettings, viewport: &Viewport) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let size = Vec2::new(viewport.width, viewport.height);
        let stars = (0..config.count)
            .map(|_| {
                let z = config.near_plane + rng.f32() * (config.max_depth - config.near_plane);
                Starfield::spawn(&mut rng, size, z)
            })
            .collect();
        Starfield {
            settings: config.clone(),
            rng,
            stars,
            size,
            warp: false,
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.size = Vec2::new(viewport.width, viewport.height);
    }

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle) {
        self.warp = signals.hover_active;
        let s = &self.settings;
        let speed = if self.warp { s.warp_speed } else { s.cruise_speed };
        let travel = speed * frame.dt;
        for star in &mut self.stars {
            star.z -= travel;
            if star.z <= s.near_plane {
                *star = Starfield::spawn(&mut self.rng, self.size, s.max_depth);
            }
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        let s = &self.settings;
        surface.wash(TRAIL.with_alpha(s.trail_alpha).into());

        for star in &self.stars {
            let at = self.project(*star, star.z);
            let near = self.closeness(star.z);
            let radius = (near * s.max_radius).max(0.1);
            surface.fill_circle(at.x, at.y, radius, Rgba::ACCENT.with_alpha(near).into());

            if self.warp {
                let tail = self.project(*star, star.z + s.streak_depth);
                surface.line(at.to_array(), tail.to_array(), radius, Rgba::ACCENT.with_alpha(near * 0.5));
            }
        }
    }
}
