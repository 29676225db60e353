// Service-card mini canvases. One engine, six kernels; hover doubles the pace
// and switches strokes to the accent color.
// Agent sets are built lazily on the first step and dropped on resize.

use std::f64::consts::TAU;

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::{CardKernel, ServiceCardSettings};
use crate::controller::Simulation;
use crate::nodes::NodeHost;
use crate::surface::{DrawCommand, GradientStop, Paint, Surface};
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

const RAIN_PITCH: f32 = 14.0;
const RAIN_GLYPH_SIZE: f32 = 12.0;
const RAIN_RESET_CHANCE: f32 = 0.025;
/// Katakana block the rain draws from.
const RAIN_GLYPH_BASE: u32 = 0x30A0;

const WAVE_LINES: usize = 8;
const WAVE_STEP: f32 = 5.0;

const PLEXUS_LINK: f32 = 100.0;

const GRID: f32 = 10.0;
const CRAWLER_SPEED: f32 = 2.0;
const TURN_CHANCE: f32 = 0.05;
const RESPAWN_CHANCE: f32 = 0.01;

const ORBIT_RINGS: usize = 4;

const SCAN_MARGIN: f32 = 100.0;
const SCAN_GLOW: f32 = 60.0;

/// Per-column drop rows of the matrix rain, sized to the surface width.
#[derive(Debug, Clone, PartialEq)]
pub struct Rain {
    rows: Vec<f32>,
    glyphs: Vec<char>,
}

impl Rain {
    fn new(width: f32) -> Self {
        let columns = (width / RAIN_PITCH).floor().max(0.0) as usize;
        Rain {
            rows: vec![1.0; columns],
            glyphs: vec![' '; columns],
        }
    }

    pub fn columns(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlexusNode {
    pub pos: Vec2,
    vel: Vec2,
    phase: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crawler {
    pub prev: Vec2,
    pub pos: Vec2,
    vel: Vec2,
    accent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Idea {
    pos: Vec2,
    size: f32,
}

fn snapped(rng: &mut fastrand::Rng, size: Vec2) -> Vec2 {
    Vec2::new(
        (rng.f32() * size.x / GRID).floor() * GRID,
        (rng.f32() * size.y / GRID).floor() * GRID,
    )
}

fn either(rng: &mut fastrand::Rng, v: f32) -> f32 {
    if rng.bool() {
        v
    } else {
        -v
    }
}

pub struct ServiceCard {
    settings: ServiceCardSettings,
    rng: fastrand::Rng,
    size: Vec2,
    /// Elapsed nominal frames.
    time: f64,
    hover: bool,
    rain: Option<Rain>,
    plexus: Option<Vec<PlexusNode>>,
    crawlers: Option<Vec<Crawler>>,
    ideas: Option<Vec<Idea>>,
    scan: f32,
}

impl ServiceCard {
    pub fn kernel(&self) -> CardKernel {
        self.settings.kernel
    }

    pub fn rain(&self) -> Option<&Rain> {
        self.rain.as_ref()
    }

    pub fn plexus(&self) -> Option<&[PlexusNode]> {
        self.plexus.as_deref()
    }

    pub fn crawlers(&self) -> Option<&[Crawler]> {
        self.crawlers.as_deref()
    }

    pub fn scan_x(&self) -> f32 {
        self.scan
    }

    fn pace(&self) -> f32 {
        if self.hover {
            2.0
        } else {
            1.0
        }
    }

    /// Extra opacity for the narrow-screen variant.
    fn boost(&self) -> f32 {
        if self.settings.compact {
            0.2
        } else {
            0.0
        }
    }

    fn ink(&self, alpha: f32) -> Rgba {
        let base = if self.hover { Rgba::ACCENT } else { Rgba::WHITE };
        base.with_alpha(alpha.min(1.0))
    }

    fn stroke(&self, normal: f32, compact: f32) -> f32 {
        if self.settings.compact {
            compact
        } else {
            normal
        }
    }

    fn drop_caches(&mut self) {
        self.rain = None;
        self.plexus = None;
        self.crawlers = None;
        self.ideas = None;
    }

    fn step_rain(&mut self, frames: f32) {
        let size = self.size;
        let pace = self.pace();
        let rng = &mut self.rng;
        let rain = self.rain.get_or_insert_with(|| Rain::new(size.x));
        for (row, glyph) in rain.rows.iter_mut().zip(rain.glyphs.iter_mut()) {
            *glyph = char::from_u32(RAIN_GLYPH_BASE + rng.u32(0..96)).unwrap_or(' ');
            if *row * RAIN_PITCH > size.y && rng.f32() < RAIN_RESET_CHANCE {
                *row = 0.0;
            }
            *row += frames * pace;
        }
    }

    fn step_plexus(&mut self, frames: f32) {
        let size = self.size;
        let pace = self.pace();
        let count = if self.settings.compact { 15 } else { 25 };
        let rng = &mut self.rng;
        let nodes = self.plexus.get_or_insert_with(|| {
            (0..count)
                .map(|_| PlexusNode {
                    pos: Vec2::new(rng.f32() * size.x, rng.f32() * size.y),
                    vel: Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 0.5,
                    phase: rng.f32() * std::f32::consts::TAU,
                })
                .collect()
        });
        for node in nodes.iter_mut() {
            node.pos += node.vel * frames * pace;
            if node.pos.x < 0.0 || node.pos.x > size.x {
                node.vel.x = -node.vel.x;
            }
            if node.pos.y < 0.0 || node.pos.y > size.y {
                node.vel.y = -node.vel.y;
            }
        }
    }

    fn step_crawlers(&mut self, frames: f32) {
        let size = self.size;
        let pace = self.pace();
        let count = if self.settings.compact { 5 } else { 8 };
        let rng = &mut self.rng;
        let crawlers = self.crawlers.get_or_insert_with(|| {
            (0..count)
                .map(|_| {
                    let pos = snapped(rng, size);
                    Crawler {
                        prev: pos,
                        pos,
                        vel: Vec2::new(either(rng, CRAWLER_SPEED), 0.0),
                        accent: rng.bool(),
                    }
                })
                .collect()
        });
        for c in crawlers.iter_mut() {
            c.prev = c.pos;
            c.pos += c.vel * frames * pace;

            if rng.f32() < TURN_CHANCE {
                c.vel = if c.vel.x != 0.0 {
                    Vec2::new(0.0, either(rng, CRAWLER_SPEED))
                } else {
                    Vec2::new(either(rng, CRAWLER_SPEED), 0.0)
                };
            }

            let outside = c.pos.x < 0.0 || c.pos.x > size.x || c.pos.y < 0.0 || c.pos.y > size.y;
            if outside || rng.f32() < RESPAWN_CHANCE {
                c.pos = snapped(rng, size);
                c.prev = c.pos;
            }
        }
    }

    fn step_scanner(&mut self, frames: f32) {
        let size = self.size;
        let count = if self.settings.compact { 12 } else { 20 };
        let rng = &mut self.rng;
        self.ideas.get_or_insert_with(|| {
            (0..count)
                .map(|_| Idea {
                    pos: Vec2::new(rng.f32() * size.x, rng.f32() * size.y),
                    size: rng.f32() * 2.0 + 1.0,
                })
                .collect()
        });
        let speed = if self.hover { 4.0 } else { 1.0 };
        self.scan = (self.scan + frames * speed).rem_euclid(size.x + SCAN_MARGIN);
    }

    fn draw_rain(&self, surface: &mut dyn Surface) {
        let (w, h) = (self.size.x, self.size.y);
        surface.fill_rect(0.0, 0.0, w, h, Rgba::BLACK.with_alpha(0.1).into());
        let Some(rain) = &self.rain else {
            return;
        };
        let color = if self.hover {
            Rgba::ACCENT
        } else {
            Rgba::WHITE.with_alpha(0.25 + self.boost())
        };
        for (i, (row, ch)) in rain.rows.iter().zip(&rain.glyphs).enumerate() {
            surface.submit(DrawCommand::Glyph {
                ch: *ch,
                x: i as f32 * RAIN_PITCH,
                y: row * RAIN_PITCH,
                size: RAIN_GLYPH_SIZE,
                color,
            });
        }
    }

    fn draw_waves(&self, surface: &mut dyn Surface) {
        surface.clear();
        let (w, h) = (self.size.x, self.size.y);
        let step = h / WAVE_LINES as f32;
        let amplitude = if self.hover { 20.0 } else { 5.0 };
        let width = self.stroke(1.5, 2.0);
        let t = self.time;
        for i in 0..WAVE_LINES {
            let base = i as f32 * step + step / 2.0;
            let alpha = if self.hover {
                0.3 + (i as f32 / WAVE_LINES as f32) * 0.4
            } else {
                0.1 + self.boost()
            };
            let frequency = 0.01 + i as f64 * 0.002;
            let phase = t * 0.05 + i as f64;
            let points = (0..)
                .map(|k| k as f32 * WAVE_STEP)
                .take_while(|x| *x < w)
                .map(|x| {
                    let xf = x as f64;
                    let swell = ((xf * frequency + phase).sin() * (t * 0.02 + xf * 0.005).sin()) as f32;
                    [x, base + swell * amplitude]
                })
                .collect::<Vec<_>>();
            if points.len() > 1 {
                surface.submit(DrawCommand::Polyline {
                    points,
                    width,
                    color: self.ink(alpha),
                });
            }
        }
    }

    fn draw_plexus(&self, surface: &mut dyn Surface) {
        surface.clear();
        let Some(nodes) = &self.plexus else {
            return;
        };
        let radius = if self.hover { 2.5 } else { self.stroke(1.5, 2.0) };
        for node in nodes {
            let pulse = ((self.time * 0.1 + node.phase as f64).sin() * 0.5 + 0.5) as f32;
            let alpha = if self.hover {
                0.5 + pulse * 0.5
            } else {
                0.15 + pulse * 0.15 + self.boost()
            };
            surface.fill_circle(node.pos.x, node.pos.y, radius, self.ink(alpha).into());
        }

        let link = if self.hover { 0.2 } else { 0.05 + self.boost() };
        let width = self.stroke(1.0, 1.5);
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let dist = a.pos.distance(b.pos);
                if dist >= PLEXUS_LINK {
                    continue;
                }
                let fade = 1.0 - dist / PLEXUS_LINK;
                let fade = if self.settings.compact { (fade * 2.0).min(1.0) } else { fade };
                surface.line(a.pos.to_array(), b.pos.to_array(), width, self.ink(link * fade));
            }
        }
    }

    fn draw_crawlers(&self, surface: &mut dyn Surface) {
        let (w, h) = (self.size.x, self.size.y);
        surface.fill_rect(0.0, 0.0, w, h, Rgba::BLACK.with_alpha(0.1).into());
        let Some(crawlers) = &self.crawlers else {
            return;
        };
        let width = self.stroke(2.0, 2.5);
        for c in crawlers {
            let color = match (self.hover, c.accent) {
                (true, true) => Rgba::ACCENT,
                (true, false) => Rgba::WHITE,
                (false, _) => Rgba::WHITE.with_alpha(0.15 + self.boost()),
            };
            surface.line(c.prev.to_array(), c.pos.to_array(), width, color);
        }

        if self.hover {
            let dot = Paint::from(Rgba::WHITE.with_alpha(0.05));
            let mut x = 0.0;
            while x < w {
                let mut y = 0.0;
                while y < h {
                    surface.fill_rect(x, y, 1.0, 1.0, dot.clone());
                    y += 20.0;
                }
                x += 20.0;
            }
        }
    }

    fn draw_orbit(&self, surface: &mut dyn Surface) {
        surface.clear();
        let c = self.size * 0.5;
        let width = self.stroke(1.0, 1.5);
        for i in 0..ORBIT_RINGS {
            let fi = i as f32;
            let r = 40.0 + fi * 25.0;
            let squish = 0.4 + fi * 0.1;
            let rotation = fi * std::f32::consts::PI / ORBIT_RINGS as f32;
            let alpha = if self.hover { 0.4 - fi * 0.05 } else { 0.1 + self.boost() };
            surface.submit(DrawCommand::StrokeEllipse {
                x: c.x,
                y: c.y,
                rx: r,
                ry: r * squish,
                rotation,
                width,
                color: self.ink(alpha),
            });

            let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
            let speed = 0.02 * self.pace() as f64 * dir;
            let t = (self.time * speed + i as f64 * 100.0).rem_euclid(TAU) as f32;
            let (sr, cr) = rotation.sin_cos();
            let px = c.x + r * t.cos() * cr - r * squish * t.sin() * sr;
            let py = c.y + r * t.cos() * sr + r * squish * t.sin() * cr;

            if self.hover {
                surface.shadow(10.0, Rgba::ACCENT);
            }
            let planet = if self.hover { 3.0 } else { self.stroke(2.0, 2.5) };
            surface.fill_circle(px, py, planet, self.ink(1.0).into());
            if self.hover {
                surface.shadow(0.0, Rgba::ACCENT);
            }
        }

        let core = if self.hover {
            Rgba::WHITE
        } else {
            Rgba::WHITE.with_alpha(0.2 + self.boost())
        };
        surface.fill_circle(c.x, c.y, self.stroke(3.0, 4.0), core.into());
    }

    fn draw_scanner(&self, surface: &mut dyn Surface) {
        let (w, h) = (self.size.x, self.size.y);
        surface.fill_rect(0.0, 0.0, w, h, Rgba::BLACK.with_alpha(0.2).into());
        let x = self.scan;

        if let Some(ideas) = &self.ideas {
            let scale = self.stroke(1.0, 1.5);
            for idea in ideas {
                let dist = (idea.pos.x - (x - 50.0)).abs();
                if dist >= SCAN_GLOW {
                    continue;
                }
                let intensity = 1.0 - dist / SCAN_GLOW;
                surface.shadow(intensity * 10.0, Rgba::ACCENT);
                surface.fill_circle(
                    idea.pos.x,
                    idea.pos.y,
                    idea.size * scale,
                    Rgba::ACCENT.with_alpha(intensity).into(),
                );
            }
            surface.shadow(0.0, Rgba::ACCENT);
        }

        let bar = if self.hover { 0.3 } else { 0.1 + self.boost() };
        let tail = Paint::Linear {
            from: [x - 50.0, 0.0],
            to: [x, 0.0],
            stops: vec![
                GradientStop::new(0.0, Rgba::ACCENT.with_alpha(0.0)),
                GradientStop::new(1.0, self.ink(bar)),
            ],
        };
        surface.fill_rect(x - SCAN_GLOW, 0.0, SCAN_GLOW, h, tail);
        let line = if self.hover {
            Rgba::ACCENT
        } else {
            Rgba::WHITE.with_alpha(0.3 + self.boost())
        };
        surface.fill_rect(x, 0.0, self.stroke(1.0, 2.0), h, line.into());
    }
}

impl Simulation for ServiceCard {
    type Config = ServiceCardSettings;
    const KIND: EngineKind = EngineKind::ServiceCard;

    fn build(config: &ServiceCardSettings, viewport: &Viewport) -> Self {
        ServiceCard {
            settings: config.clone(),
            rng: fastrand::Rng::with_seed(config.seed),
            size: Vec2::new(viewport.width, viewport.height),
            time: 0.0,
            hover: false,
            rain: None,
            plexus: None,
            crawlers: None,
            ideas: None,
            scan: 0.0,
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.size = Vec2::new(viewport.width, viewport.height);
        log::debug!("service card {:?}: size changed, dropping agent caches", self.settings.kernel);
        self.drop_caches();
    }

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle) {
        self.hover = signals.hover_active;
        let frames = frame.frames();
        self.time += frames as f64;
        match self.settings.kernel {
            CardKernel::Matrix => self.step_rain(frames),
            CardKernel::Plexus => self.step_plexus(frames),
            CardKernel::Circuitry => self.step_crawlers(frames),
            CardKernel::Scanner => self.step_scanner(frames),
            CardKernel::Waves | CardKernel::Orbit => {}
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        match self.settings.kernel {
            CardKernel::Matrix => self.draw_rain(surface),
            CardKernel::Waves => self.draw_waves(surface),
            CardKernel::Plexus => self.draw_plexus(surface),
            CardKernel::Circuitry => self.draw_crawlers(surface),
            CardKernel::Orbit => self.draw_orbit(surface),
            CardKernel::Scanner => self.draw_scanner(surface),
        }
    }
}
