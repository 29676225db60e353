// Floating world: image craft drifting across the top band as retained nodes,
// plus a canvas flock of small birds flying right to left.

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::{CraftSpec, FloatingWorldSettings};
use crate::controller::Simulation;
use crate::easing::{keyframes, lerp};
use crate::nodes::{NodeHost, NodeParent, NodeSpec, OwnedNode};
use crate::surface::{DrawCommand, Surface};
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

/// Craft loop ends, in viewport-width percent.
const OFF_LEFT: f32 = -60.0;
const OFF_RIGHT: f32 = 160.0;
const CRAFT_OPACITY: [(f32, f32); 4] = [(0.0, 0.0), (0.1, 0.8), (0.9, 0.8), (1.0, 0.0)];

/// Birds this far outside the surface wrap around.
const BIRD_MARGIN: f32 = 100.0;
/// Wing stroke: 0.25 alpha on a layer shown at 0.6.
const BIRD_INK: Rgba = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 0.15,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraftPose {
    /// Horizontal offset in viewport-width percent.
    pub x_vw: f32,
    pub y_px: f32,
    pub opacity: f32,
}

struct Craft {
    spec: CraftSpec,
    scale: f32,
    y_end: f32,
    node: Option<OwnedNode>,
}

impl Craft {
    /// Pose at `time` seconds after activation. Negative delays start mid-flight.
    fn pose(&self, time: f64) -> CraftPose {
        let duration = self.spec.duration.max(f32::EPSILON) as f64;
        let u = ((time - self.spec.delay as f64).rem_euclid(duration) / duration) as f32;
        let travel = self.spec.easing.apply(u);
        let (from, to) = if self.spec.reverse {
            (OFF_LEFT, OFF_RIGHT)
        } else {
            (OFF_RIGHT, OFF_LEFT)
        };
        CraftPose {
            x_vw: lerp(from, to, travel),
            y_px: lerp(0.0, self.y_end, travel),
            opacity: keyframes(&CRAFT_OPACITY, u),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bird {
    pub pos: Vec2,
    scale: f32,
    /// Leftward speed, px/s.
    speed: f32,
    /// Vertical drift, px/s.
    pub vy: f32,
    wing: f32,
}

pub struct FloatingWorld {
    settings: FloatingWorldSettings,
    craft: Vec<Craft>,
    birds: Vec<Bird>,
    neighbours: Vec<(Vec2, f32)>,
    size: Vec2,
    time: f64,
}

fn range(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + rng.f32() * (hi - lo)
}

impl FloatingWorld {
    pub fn birds(&self) -> &[Bird] {
        &self.birds
    }

    pub fn craft_poses(&self) -> Vec<CraftPose> {
        self.craft.iter().map(|c| c.pose(self.time)).collect()
    }

    /// Alignment and cohesion on the vertical drift only; horizontal speed
    /// stays per-bird.
    fn flock(&mut self, dt: f32) {
        let s = &self.settings;
        self.neighbours.clear();
        self.neighbours.extend(self.birds.iter().map(|b| (b.pos, b.vy)));
        for (i, bird) in self.birds.iter_mut().enumerate() {
            let mut sum_y = 0.0;
            let mut sum_vy = 0.0;
            let mut count = 0;
            for (j, (pos, vy)) in self.neighbours.iter().enumerate() {
                if i != j && bird.pos.distance(*pos) < s.flock_radius {
                    sum_y += pos.y;
                    sum_vy += vy;
                    count += 1;
                }
            }
            if count > 0 {
                let n = count as f32;
                bird.vy += (sum_vy / n - bird.vy) * s.alignment * dt;
                bird.vy += (sum_y / n - bird.pos.y) * s.cohesion * dt;
                bird.vy = bird.vy.clamp(-s.vertical_drift, s.vertical_drift);
            }
        }
    }
}

impl Simulation for FloatingWorld {
    type Config = FloatingWorldSettings;
    const KIND: EngineKind = EngineKind::FloatingWorld;
    const NEEDS_SURFACE: bool = false;

    fn build(config: &FloatingWorldSettings, viewport: &Viewport) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let craft = config
            .craft
            .iter()
            .map(|spec| Craft {
                spec: spec.clone(),
                scale: range(&mut rng, 0.4, 0.55),
                y_end: range(&mut rng, -10.0, 10.0),
                node: None,
            })
            .collect();
        let (w, h) = (viewport.width, viewport.height);
        let birds: Vec<Bird> = (0..config.bird_count)
            .map(|_| Bird {
                pos: Vec2::new(range(&mut rng, 0.0, w), range(&mut rng, 0.0, h * config.spawn_band)),
                scale: range(&mut rng, 1.0, 3.0) * 0.25,
                speed: range(&mut rng, config.bird_speed.0, config.bird_speed.1),
                vy: range(&mut rng, 0.0, 10.0).sin() * config.vertical_drift,
                wing: range(&mut rng, 0.0, std::f32::consts::TAU),
            })
            .collect();
        FloatingWorld {
            settings: config.clone(),
            craft,
            neighbours: Vec::with_capacity(birds.len()),
            birds,
            size: Vec2::new(w, h),
            time: 0.0,
        }
    }

    fn setup(&mut self, host: &mut dyn NodeHost) {
        for craft in &mut self.craft {
            let spec = &craft.spec;
            craft.node = Some(OwnedNode::create(
                host,
                NodeSpec::new("img", NodeParent::Layer)
                    .attr("src", format!("{}{}", self.settings.base_url, spec.src))
                    .attr("alt", "floating craft")
                    .attr("style.position", "absolute")
                    .attr("style.left", "0")
                    .attr("style.top", format!("{}%", spec.top))
                    .attr("style.width", format!("{}vw", spec.width_vw))
                    .attr("style.maxWidth", "280px")
                    .attr("style.zIndex", (spec.width_vw.floor() as i32).to_string())
                    .attr("style.willChange", "transform")
                    .attr("style.filter", "drop-shadow(0 15px 30px rgba(0,0,0,0.3))")
                    .attr("style.opacity", "0"),
            ));
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.size = Vec2::new(viewport.width, viewport.height);
    }

    fn step(&mut self, frame: &FrameTime, _signals: &SignalBundle) {
        let dt = frame.dt;
        self.time += dt as f64;
        self.flock(dt);

        let (w, h) = (self.size.x, self.size.y);
        let band = h * self.settings.wrap_band;
        let wing_rate = self.settings.wing_rate;
        for bird in &mut self.birds {
            bird.pos.x -= bird.speed * dt;
            bird.pos.y += bird.vy * dt;
            bird.wing = (bird.wing + wing_rate * dt) % std::f32::consts::TAU;

            if bird.pos.x < -BIRD_MARGIN {
                bird.pos.x = w + BIRD_MARGIN;
            }
            if bird.pos.y < -BIRD_MARGIN {
                bird.pos.y = band;
            } else if bird.pos.y > band {
                bird.pos.y = -BIRD_MARGIN;
            }
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, host: &mut dyn NodeHost) {
        for craft in &self.craft {
            let Some(node) = craft.node.as_ref() else {
                continue;
            };
            let pose = craft.pose(self.time);
            node.set(
                host,
                "style.transform",
                format!(
                    "translateX({:.3}vw) translateY({:.2}px) rotate({}deg) scale({:.3})",
                    pose.x_vw, pose.y_px, craft.spec.rotate_deg, craft.scale
                ),
            );
            node.set(host, "style.opacity", format!("{:.3}", pose.opacity));
        }

        let Some(surface) = surface else {
            return;
        };
        surface.clear();
        for bird in &self.birds {
            let lift = bird.wing.sin() * 3.0 * bird.scale;
            let reach = 8.0 * bird.scale;
            let p = bird.pos;
            surface.submit(DrawCommand::Polyline {
                points: vec![[p.x - reach, p.y - lift], [p.x, p.y], [p.x + reach, p.y - lift]],
                width: 1.0,
                color: BIRD_INK,
            });
        }
    }

    fn teardown(&mut self, host: &mut dyn NodeHost) {
        for craft in &mut self.craft {
            if let Some(node) = craft.node.take() {
                node.release(host);
            }
        }
    }
}
