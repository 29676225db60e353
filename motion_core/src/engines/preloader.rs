// Preloader particle system: ORBITING → IMPLODING → FLASHING → DONE.
// Progression is one-way; the completion hook fires at most once per activation.

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::PreloaderSettings;
use crate::controller::{CompletionHook, Simulation};
use crate::nodes::NodeHost;
use crate::surface::{GradientStop, Paint, Surface};
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

/// Orbiting particles this close to the centre respawn on the outer shell.
const ORBIT_RECYCLE_RADIUS: f32 = 10.0;
/// Pulse phase advance per second for the core glyph.
const PULSE_RATE: f32 = 1.2;
/// Core glyph shrink while imploding, px per second.
const CORE_SHRINK: f32 = 36.0;
/// Above this speed (px per nominal frame) particles are drawn stretched.
const STREAK_SPEED: f32 = 5.0;

const BACKDROP_INNER: Rgba = Rgba::rgb(10, 10, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Orbiting,
    Imploding,
    Flashing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Offset from the surface centre.
    pub pos: Vec2,
    pub z: f32,
    /// Velocity in px per nominal frame.
    pub vel: Vec2,
    pub vz: f32,
    pub size: f32,
    base_size: f32,
    accent: bool,
}

impl Particle {
    fn spawn(rng: &mut fastrand::Rng, initial: bool) -> Self {
        let angle = rng.f32() * std::f32::consts::TAU;
        let radius = if initial {
            200.0 + rng.f32() * 800.0
        } else {
            800.0 + rng.f32() * 500.0
        };
        let base_size = rng.f32() * 2.0 + 0.5;
        Particle {
            pos: Vec2::from_angle(angle) * radius,
            z: (rng.f32() - 0.5) * 500.0,
            vel: Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 2.0,
            vz: rng.f32() - 0.5,
            size: base_size,
            base_size,
            accent: rng.f32() > 0.8,
        }
    }

    fn color(&self) -> Rgba {
        if self.accent {
            Rgba::ACCENT
        } else {
            Rgba::WHITE
        }
    }
}

pub struct Preloader {
    settings: PreloaderSettings,
    rng: fastrand::Rng,
    particles: Vec<Particle>,
    phase: Phase,
    progress: f32,
    pulse: f32,
    implode_time: f32,
    flash: f32,
    center: Vec2,
    width: f32,
    hook: Option<CompletionHook>,
    completed: bool,
}

impl Preloader {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn flash_intensity(&self) -> f32 {
        self.flash
    }

    fn accent_alpha(&self) -> f32 {
        if self.flash > self.settings.accent_threshold {
            (self.flash * self.flash).min(1.0)
        } else {
            0.0
        }
    }

    /// Accent wash centred on the core, densest in the middle. Its radius
    /// reaches the surface corners so nothing is left uncovered.
    fn accent_flash(&self, alpha: f32) -> Paint {
        Paint::Radial {
            center: self.center.to_array(),
            inner: 0.0,
            outer: self.center.length().max(1.0),
            stops: vec![
                GradientStop::new(0.0, Rgba::ACCENT.with_alpha(alpha)),
                GradientStop::new(1.0, Rgba::ACCENT.with_alpha(alpha * 0.6)),
            ],
        }
    }

    fn white_alpha(&self) -> f32 {
        let span = (1.0 - self.settings.white_threshold).max(f32::EPSILON);
        ((self.flash - self.settings.white_threshold) / span).clamp(0.0, 1.0)
    }

    fn core_radius(&self) -> f32 {
        let pulse = (self.pulse * 3.0).sin() * 5.0;
        let base = match self.phase {
            Phase::Orbiting => 2.0 + self.progress * 40.0,
            _ => 10.0 - self.implode_time * CORE_SHRINK,
        };
        (base + pulse).max(0.0)
    }

    fn orbit(&mut self, frames: f32) {
        let force = (self.progress + 0.1) * self.settings.orbit_gain;
        let damping = self.settings.orbit_damping.powf(frames);
        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            let dist = p.pos.length().max(1e-3);
            let dir = -p.pos / dist;
            p.vel += dir * force * frames;
            p.pos += p.vel * frames;
            p.z += p.vz * frames;
            p.vel *= damping;
            if dist < ORBIT_RECYCLE_RADIUS {
                self.particles[i] = Particle::spawn(&mut self.rng, false);
            }
        }
    }

    fn implode(&mut self, frames: f32) {
        let s = &self.settings;
        let damping = s.implode_damping.powf(frames);
        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            let dist = p.pos.length().max(1e-3);
            let dir = -p.pos / dist;
            let force = s.implode_force / (dist + s.implode_softening);
            p.vel += dir * force * frames;
            p.vel *= damping;
            p.pos += p.vel * frames;
            if dist < s.mass_radius {
                p.size = p.base_size * (1.0 + (s.mass_radius - dist) / 10.0);
            }
            if dist < s.implode_recycle_radius {
                self.particles[i] = Particle::spawn(&mut self.rng, false);
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        log::info!("preloader: done");
        if self.completed {
            return;
        }
        self.completed = true;
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

impl Simulation for Preloader {
    type Config = PreloaderSettings;
    const KIND: EngineKind = EngineKind::Preloader;

    fn build(config: &PreloaderSettings, viewport: &Viewport) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let count = if viewport.width < config.compact_width {
            config.compact_particle_count
        } else {
            config.particle_count
        };
        let particles = (0..count).map(|_| Particle::spawn(&mut rng, true)).collect();
        Preloader {
            settings: config.clone(),
            rng,
            particles,
            phase: Phase::Orbiting,
            progress: 0.0,
            pulse: 0.0,
            implode_time: 0.0,
            flash: 0.0,
            center: viewport.center(),
            width: viewport.width,
            hook: None,
            completed: false,
        }
    }

    fn resize(&mut self, viewport: &Viewport) {
        self.center = viewport.center();
        self.width = viewport.width;
    }

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle) {
        if self.phase == Phase::Done {
            return;
        }
        let progress = signals.effective_progress();
        self.progress = progress as f32 / 100.0;
        self.pulse += PULSE_RATE * frame.dt;

        match self.phase {
            Phase::Orbiting if progress >= 100 => {
                log::info!("preloader: imploding");
                self.phase = Phase::Imploding;
            }
            Phase::Imploding if self.flash > self.settings.accent_threshold => {
                log::info!("preloader: flashing");
                self.phase = Phase::Flashing;
            }
            _ => {}
        }

        let frames = frame.frames();
        if self.phase == Phase::Orbiting {
            self.orbit(frames);
            return;
        }

        self.implode(frames);
        self.implode_time += frame.dt;
        self.flash += self.settings.flash_rate * frame.dt;
        if self.phase == Phase::Flashing && self.white_alpha() >= 1.0 {
            self.finish();
        }
    }

    fn render(&self, surface: Option<&mut dyn Surface>, _nodes: &mut dyn NodeHost) {
        let Some(surface) = surface else {
            return;
        };
        if self.phase == Phase::Done {
            surface.wash(Rgba::WHITE.into());
            return;
        }

        let c = self.center;
        surface.wash(Paint::Radial {
            center: c.to_array(),
            inner: 0.0,
            outer: self.width.max(1.0),
            stops: vec![
                GradientStop::new(0.0, BACKDROP_INNER),
                GradientStop::new(1.0, Rgba::BLACK),
            ],
        });

        let imploding = self.phase != Phase::Orbiting;
        if !imploding || self.flash < self.settings.white_threshold {
            let blur = if imploding { 100.0 } else { 40.0 * self.progress };
            let color = if self.progress > 0.9 { Rgba::ACCENT } else { Rgba::WHITE };
            surface.shadow(blur, Rgba::ACCENT);
            surface.fill_circle(c.x, c.y, self.core_radius(), color.into());
            surface.shadow(0.0, Rgba::ACCENT.with_alpha(0.0));
        }

        let alpha = (0.4 + self.progress * 0.6 - self.flash).max(0.0);
        if alpha > 0.0 {
            for p in &self.particles {
                let at = c + p.pos;
                let color = p.color().with_alpha(alpha);
                let speed = p.vel.length();
                if speed > STREAK_SPEED {
                    let angle = p.vel.y.atan2(p.vel.x);
                    surface.fill_ellipse(at.x, at.y, p.size * 2.0, p.size * 0.5, angle, color.into());
                } else {
                    surface.fill_circle(at.x, at.y, p.size, color.into());
                }
            }
        }

        if !imploding {
            let reach = self.settings.link_distance;
            for (i, a) in self.particles.iter().enumerate() {
                for b in &self.particles[i + 1..] {
                    let dist = a.pos.distance(b.pos);
                    if dist < reach {
                        let t = 1.0 - dist / reach;
                        surface.line(
                            (c + a.pos).to_array(),
                            (c + b.pos).to_array(),
                            t * 0.5,
                            Rgba::ACCENT.with_alpha(t * 0.2 * self.progress),
                        );
                    }
                }
            }
            return;
        }

        let accent = self.accent_alpha();
        if accent > 0.0 {
            surface.wash(self.accent_flash(accent));
        }
        surface.wash(Rgba::WHITE.with_alpha(self.white_alpha()).into());
    }

    fn set_completion_hook(&mut self, hook: CompletionHook) {
        if self.completed {
            return;
        }
        self.hook = Some(hook);
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameSettings;
    use crate::controller::ActiveEngine;
    use crate::host::FrameQueue;
    use crate::surface::{DisplayList, DrawCommand};
    use crate::types::Timestamp;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const DT: f32 = 0.016;

    fn preloader() -> Preloader {
        Preloader::build(&PreloaderSettings::default(), &Viewport::new(1280.0, 720.0, 1.0))
    }

    fn step(p: &mut Preloader, progress: u8) {
        let signals = SignalBundle {
            progress,
            ..Default::default()
        };
        p.step(&FrameTime::fixed(DT, 0.0), &signals);
    }

    fn counting_hook(p: &mut Preloader) -> Rc<Cell<u32>> {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        p.set_completion_hook(Box::new(move || seen.set(seen.get() + 1)));
        calls
    }

    #[test]
    fn progress_sequence_reaches_done_with_one_callback() {
        let mut p = preloader();
        let calls = counting_hook(&mut p);

        for progress in [0, 10, 45, 80] {
            step(&mut p, progress);
            assert_eq!(p.phase(), Phase::Orbiting);
        }
        step(&mut p, 100);
        assert_eq!(p.phase(), Phase::Imploding);

        let mut done_at = None;
        for tick in 0..200 {
            step(&mut p, 100);
            if done_at.is_none() && p.phase() == Phase::Done {
                done_at = Some(tick);
            }
        }
        let done_at = done_at.expect("never reached DONE");
        assert!(done_at < 60, "took {done_at} ticks");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn phases_advance_in_order() {
        let mut p = preloader();
        let mut seen = vec![p.phase()];
        step(&mut p, 100);
        for _ in 0..100 {
            if seen.last() != Some(&p.phase()) {
                seen.push(p.phase());
            }
            step(&mut p, 100);
        }
        assert_eq!(
            seen,
            vec![Phase::Orbiting, Phase::Imploding, Phase::Flashing, Phase::Done]
        );
    }

    #[test]
    fn load_complete_event_counts_as_full_progress() {
        let mut p = preloader();
        let signals = SignalBundle {
            progress: 30,
            load_complete: true,
            ..Default::default()
        };
        p.step(&FrameTime::fixed(DT, 0.0), &signals);
        assert_eq!(p.phase(), Phase::Imploding);
    }

    #[test]
    fn done_freezes_particles_and_renders_white() {
        let mut p = preloader();
        while p.phase() != Phase::Done {
            step(&mut p, 100);
        }
        let frozen = p.particles().to_vec();
        let flash = p.flash_intensity();
        for _ in 0..50 {
            step(&mut p, 100);
        }
        assert_eq!(p.particles(), &frozen[..]);
        assert_eq!(p.flash_intensity(), flash);

        let mut list = DisplayList::new();
        let mut nodes = crate::nodes::NodeRegistry::new();
        p.render(Some(&mut list), &mut nodes);
        assert_eq!(
            list.take_commands(),
            vec![DrawCommand::Wash {
                paint: Rgba::WHITE.into()
            }]
        );
    }

    #[test]
    fn accent_flash_is_a_radial_wash_from_the_centre() {
        let mut p = preloader();
        while p.accent_alpha() == 0.0 {
            step(&mut p, 100);
        }
        assert_ne!(p.phase(), Phase::Done);

        let mut list = DisplayList::new();
        let mut nodes = crate::nodes::NodeRegistry::new();
        p.render(Some(&mut list), &mut nodes);
        let flash = list.take_commands().into_iter().find_map(|c| match c {
            DrawCommand::Wash {
                paint: Paint::Radial { center, outer, stops, .. },
            } if stops.iter().all(|s| (s.color.r, s.color.g, s.color.b) == (212, 255, 0)) => {
                Some((center, outer, stops))
            }
            _ => None,
        });
        let (center, outer, stops) = flash.expect("no accent wash while flashing");
        assert_eq!(center, [640.0, 360.0]);
        assert!(outer >= 640.0);
        assert!(stops[0].color.a > stops[1].color.a);
    }

    #[test]
    fn hook_installed_after_done_is_not_called() {
        let mut p = preloader();
        while p.phase() != Phase::Done {
            step(&mut p, 100);
        }
        let calls = counting_hook(&mut p);
        step(&mut p, 100);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn compact_viewport_uses_fewer_particles() {
        let p = Preloader::build(&PreloaderSettings::default(), &Viewport::new(400.0, 800.0, 2.0));
        assert_eq!(p.particles().len(), 60);
        assert_eq!(preloader().particles().len(), 150);
    }

    #[test]
    fn reactivation_reproduces_fresh_state() {
        let mut queue = FrameQueue::new();
        let mut first = Vec::new();
        for _ in 0..2 {
            let mut engine = ActiveEngine::<Preloader>::activate(
                &PreloaderSettings::default(),
                FrameSettings::default(),
                Viewport::new(1280.0, 720.0, 1.0),
                Some(DisplayList::new()),
                &mut queue,
            )
            .unwrap();
            engine.tick(&mut queue, Timestamp::from_micros(0), &SignalBundle::default());
            let snapshot = engine.simulation().particles().to_vec();
            if first.is_empty() {
                first = snapshot;
            } else {
                assert_eq!(first, snapshot);
            }
            let detached = engine.deactivate(&mut queue);
            assert_eq!(detached.nodes.live_count(), 0);
        }
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.listener_count(), 0);
    }

    #[test]
    fn controller_reports_finished_and_fires_once() {
        let mut queue = FrameQueue::new();
        let mut engine = ActiveEngine::<Preloader>::activate(
            &PreloaderSettings::default(),
            FrameSettings::default(),
            Viewport::new(1280.0, 720.0, 1.0),
            Some(DisplayList::new()),
            &mut queue,
        )
        .unwrap();
        let calls = counting_hook(engine.simulation_mut());
        let signals = SignalBundle {
            progress: 100,
            ..Default::default()
        };
        let mut finished = false;
        for i in 0..120u64 {
            engine.tick(&mut queue, Timestamp::from_micros(i * 16_000), &signals);
            finished |= engine.drain().finished;
        }
        assert!(finished);
        assert_eq!(calls.get(), 1);
        engine.deactivate(&mut queue);
    }

    proptest! {
        #[test]
        fn never_implodes_below_full_progress(seq in prop::collection::vec(0u8..100, 1..80)) {
            let mut p = preloader();
            for progress in seq {
                step(&mut p, progress);
                prop_assert_eq!(p.phase(), Phase::Orbiting);
                prop_assert_eq!(p.flash_intensity(), 0.0);
            }
        }
    }
}
