// Engine controller: owns one simulation, its surface and its nodes for the
// lifetime of an activation. Stepper always finishes before the renderer reads.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::{FrameClock, FrameTime};
use crate::config::FrameSettings;
use crate::host::{FrameHost, FrameRequest, ListenerId};
use crate::nodes::{NodeHost, NodePatch, NodeRegistry};
use crate::surface::{DisplayList, DrawCommand, Surface};
use crate::types::{BackingSize, EngineKind, SignalBundle, Timestamp, Viewport};

/// Callback fired when a simulation reaches its terminal state.
pub type CompletionHook = Box<dyn FnOnce()>;

/// A procedural animation: state plus its stepper and renderer.
pub trait Simulation: Sized {
    type Config: Clone + DeserializeOwned;

    const KIND: EngineKind;

    /// Canvas-backed engines skip activation without a drawing surface.
    const NEEDS_SURFACE: bool = true;

    /// Fresh state. Must be a pure function of its inputs so re-activation
    /// reproduces the same frames.
    fn build(config: &Self::Config, viewport: &Viewport) -> Self;

    /// Internal render resolution relative to the capped device pixel ratio.
    fn resolution_scale(&self) -> f32 {
        1.0
    }

    /// Create retained nodes. Paired with `teardown`.
    fn setup(&mut self, _nodes: &mut dyn NodeHost) {}

    /// Surface size changed; drop anything cached per size.
    fn resize(&mut self, _viewport: &Viewport) {}

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle);

    fn render(&self, surface: Option<&mut dyn Surface>, nodes: &mut dyn NodeHost);

    /// Release every node created in `setup`, whatever state we are in.
    fn teardown(&mut self, _nodes: &mut dyn NodeHost) {}

    fn set_completion_hook(&mut self, _hook: CompletionHook) {}

    fn is_finished(&self) -> bool {
        false
    }
}

/// Output of one frame for the host to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameOutput {
    pub commands: Vec<DrawCommand>,
    pub patches: Vec<NodePatch>,
    pub finished: bool,
}

impl FrameOutput {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.patches.is_empty()
    }
}

/// Resources returned by `deactivate`, already released.
#[derive(Debug)]
pub struct Detached {
    pub surface: Option<DisplayList>,
    pub nodes: NodeRegistry,
    /// Whether the simulation had reached its terminal state.
    pub finished: bool,
}

impl Detached {
    pub fn into_output(mut self) -> FrameOutput {
        FrameOutput {
            commands: self
                .surface
                .as_mut()
                .map(DisplayList::take_commands)
                .unwrap_or_default(),
            patches: self.nodes.take_patches(),
            finished: self.finished,
        }
    }
}

/// Handle for one live activation. Consumed by `deactivate`, so no tick can
/// follow it.
pub struct ActiveEngine<S: Simulation> {
    sim: S,
    clock: FrameClock,
    settings: FrameSettings,
    viewport: Viewport,
    surface: Option<DisplayList>,
    nodes: NodeRegistry,
    frame: Option<FrameRequest>,
    resize_listener: ListenerId,
}

impl<S: Simulation> ActiveEngine<S> {
    /// Build fresh state, size the surface, register for resize and request
    /// the first frame. Returns `None` when a required surface is missing.
    pub fn activate(
        config: &S::Config,
        settings: FrameSettings,
        viewport: Viewport,
        surface: Option<DisplayList>,
        host: &mut dyn FrameHost,
    ) -> Option<Self> {
        if S::NEEDS_SURFACE && surface.is_none() {
            log::warn!("{:?}: no drawing surface, skipping activation", S::KIND);
            return None;
        }

        let mut sim = S::build(config, &viewport);
        let mut nodes = NodeRegistry::new();
        sim.setup(&mut nodes);

        let mut surface = surface;
        if let Some(surface) = surface.as_mut() {
            let backing = viewport.backing(settings.max_device_pixel_ratio, sim.resolution_scale());
            surface.resize(&viewport, backing);
        }

        let resize_listener = host.add_resize_listener();
        let frame = Some(host.request_frame());
        log::info!(
            "{:?}: activated at {}x{} ({} nodes)",
            S::KIND,
            viewport.width,
            viewport.height,
            nodes.live_count()
        );

        Some(ActiveEngine {
            sim,
            clock: FrameClock::new(settings),
            settings,
            viewport,
            surface,
            nodes,
            frame,
            resize_listener,
        })
    }

    /// Run one tick if our frame request is the one firing. A tick with no
    /// live request is dropped, so ticks never overlap or double up.
    pub fn tick(&mut self, host: &mut dyn FrameHost, now: Timestamp, signals: &SignalBundle) -> bool {
        let Some(request) = self.frame.take() else {
            log::warn!("{:?}: frame delivered with no pending request", S::KIND);
            return false;
        };
        if !host.fire_frame(request) {
            log::warn!("{:?}: stale frame request ignored", S::KIND);
            self.frame = Some(host.request_frame());
            return false;
        }

        let frame = self.clock.tick(now);
        self.sim.step(&frame, signals);
        self.sim
            .render(self.surface.as_mut().map(|s| s as &mut dyn Surface), &mut self.nodes);

        self.frame = Some(host.request_frame());
        true
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let backing = self.backing();
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(&viewport, backing);
        }
        self.sim.resize(&viewport);
        log::debug!(
            "{:?}: resized to {}x{} (backing {}x{})",
            S::KIND,
            viewport.width,
            viewport.height,
            backing.width,
            backing.height
        );
    }

    /// Cancel the pending frame, drop the resize listener, release every node
    /// and the backing store.
    pub fn deactivate(mut self, host: &mut dyn FrameHost) -> Detached {
        if let Some(request) = self.frame.take() {
            host.cancel_frame(request);
        }
        host.remove_resize_listener(self.resize_listener);
        let finished = self.sim.is_finished();
        self.sim.teardown(&mut self.nodes);
        if let Some(surface) = self.surface.as_mut() {
            surface.release();
        }
        if self.nodes.live_count() != 0 {
            log::warn!(
                "{:?}: {} nodes still live after teardown",
                S::KIND,
                self.nodes.live_count()
            );
        }
        log::info!("{:?}: deactivated", S::KIND);
        Detached {
            surface: self.surface,
            nodes: self.nodes,
            finished,
        }
    }

    pub fn simulation(&self) -> &S {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn surface(&self) -> Option<&DisplayList> {
        self.surface.as_ref()
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn backing(&self) -> BackingSize {
        self.viewport
            .backing(self.settings.max_device_pixel_ratio, self.sim.resolution_scale())
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Take everything recorded since the last drain.
    pub fn drain(&mut self) -> FrameOutput {
        FrameOutput {
            commands: self
                .surface
                .as_mut()
                .map(DisplayList::take_commands)
                .unwrap_or_default(),
            patches: self.nodes.take_patches(),
            finished: self.sim.is_finished(),
        }
    }
}

/// Object-safe view of an ActiveEngine, for hosts mounting mixed engines.
pub trait Mounted {
    fn kind(&self) -> EngineKind;
    fn tick(&mut self, host: &mut dyn FrameHost, now: Timestamp, signals: &SignalBundle) -> bool;
    fn resize(&mut self, viewport: Viewport);
    fn backing(&self) -> BackingSize;
    fn set_completion_hook(&mut self, hook: CompletionHook);
    fn is_finished(&self) -> bool;
    fn drain(&mut self) -> FrameOutput;
    fn deactivate(self: Box<Self>, host: &mut dyn FrameHost) -> FrameOutput;
}

impl<S: Simulation> Mounted for ActiveEngine<S> {
    fn kind(&self) -> EngineKind {
        S::KIND
    }

    fn tick(&mut self, host: &mut dyn FrameHost, now: Timestamp, signals: &SignalBundle) -> bool {
        ActiveEngine::tick(self, host, now, signals)
    }

    fn resize(&mut self, viewport: Viewport) {
        ActiveEngine::resize(self, viewport)
    }

    fn backing(&self) -> BackingSize {
        ActiveEngine::backing(self)
    }

    fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.sim.set_completion_hook(hook);
    }

    fn is_finished(&self) -> bool {
        self.sim.is_finished()
    }

    fn drain(&mut self) -> FrameOutput {
        ActiveEngine::drain(self)
    }

    fn deactivate(self: Box<Self>, host: &mut dyn FrameHost) -> FrameOutput {
        (*self).deactivate(host).into_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FrameQueue;
    use crate::nodes::{NodeParent, NodeSpec, OwnedNode};
    use crate::types::Rgba;

    /// Minimal simulation: one retained node, one circle per frame.
    struct Ticker {
        x: f32,
        node: Option<OwnedNode>,
        resized: u32,
    }

    impl Simulation for Ticker {
        type Config = ();
        const KIND: EngineKind = EngineKind::Starfield;

        fn build(_: &(), _: &Viewport) -> Self {
            Ticker {
                x: 0.0,
                node: None,
                resized: 0,
            }
        }

        fn setup(&mut self, nodes: &mut dyn NodeHost) {
            self.node = Some(OwnedNode::create(nodes, NodeSpec::new("div", NodeParent::Layer)));
        }

        fn resize(&mut self, _: &Viewport) {
            self.resized += 1;
        }

        fn step(&mut self, frame: &FrameTime, _: &SignalBundle) {
            self.x += frame.dt;
        }

        fn render(&self, surface: Option<&mut dyn Surface>, _: &mut dyn NodeHost) {
            if let Some(surface) = surface {
                surface.fill_circle(self.x, 0.0, 1.0, Rgba::WHITE.into());
            }
        }

        fn teardown(&mut self, nodes: &mut dyn NodeHost) {
            if let Some(node) = self.node.take() {
                node.release(nodes);
            }
        }
    }

    fn activate(queue: &mut FrameQueue) -> ActiveEngine<Ticker> {
        ActiveEngine::<Ticker>::activate(
            &(),
            FrameSettings::default(),
            Viewport::new(100.0, 100.0, 1.0),
            Some(DisplayList::new()),
            queue,
        )
        .unwrap()
    }

    #[test]
    fn activate_then_deactivate_leaves_nothing_behind() {
        let mut queue = FrameQueue::new();
        let engine = activate(&mut queue);
        assert_eq!(queue.listener_count(), 1);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(engine.nodes().live_count(), 1);

        let detached = engine.deactivate(&mut queue);
        assert_eq!(queue.listener_count(), 0);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(detached.nodes.live_count(), 0);
        assert!(detached.surface.unwrap().backing().is_none());
    }

    #[test]
    fn repeated_cycles_do_not_accumulate() {
        let mut queue = FrameQueue::new();
        for _ in 0..5 {
            let mut engine = activate(&mut queue);
            engine.tick(&mut queue, Timestamp::from_micros(0), &SignalBundle::default());
            engine.deactivate(&mut queue);
        }
        assert_eq!(queue.listener_count(), 0);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn missing_surface_skips_activation() {
        let mut queue = FrameQueue::new();
        let engine = ActiveEngine::<Ticker>::activate(
            &(),
            FrameSettings::default(),
            Viewport::default(),
            None,
            &mut queue,
        );
        assert!(engine.is_none());
        assert_eq!(queue.listener_count(), 0);
    }

    #[test]
    fn tick_steps_then_renders_and_rearms() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        engine.drain();

        assert!(engine.tick(&mut queue, Timestamp::from_micros(1_000), &SignalBundle::default()));
        let out = engine.drain();
        match &out.commands[..] {
            [DrawCommand::Circle { x, .. }] => assert!(*x > 0.0),
            other => panic!("unexpected commands {other:?}"),
        }
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn cancelled_request_does_not_tick() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        let pending = engine.frame.unwrap();
        queue.cancel_frame(pending);
        assert!(!engine.tick(&mut queue, Timestamp::from_micros(0), &SignalBundle::default()));
        // Re-armed with a fresh request.
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn resize_reaches_surface_and_simulation() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        engine.resize(Viewport::new(300.0, 200.0, 4.0));
        assert_eq!(engine.simulation().resized, 1);
        let backing = engine.surface().unwrap().backing().unwrap();
        assert_eq!((backing.width, backing.height), (600, 400));
        engine.deactivate(&mut queue);
    }
}
