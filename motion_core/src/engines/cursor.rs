// Custom cursor: a dot pinned to the pointer and a ring trailing it, both
// retained nodes. The ring grows while the pointer is over something clickable.

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::CursorSettings;
use crate::controller::Simulation;
use crate::follow::PointerFollower;
use crate::nodes::{NodeHost, NodeParent, NodeSpec, OwnedNode};
use crate::signals::OFF_SURFACE;
use crate::surface::Surface;
use crate::types::{EngineKind, Rgba, SignalBundle, Viewport};

pub struct CursorTrailer {
    settings: CursorSettings,
    ring: PointerFollower,
    pointer: Vec2,
    visible: bool,
    hover: bool,
    dot_node: Option<OwnedNode>,
    ring_node: Option<OwnedNode>,
}

impl CursorTrailer {
    pub fn ring_position(&self) -> Vec2 {
        self.ring.position()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn ring_size(&self) -> f32 {
        if self.hover {
            self.settings.ring_hover_size
        } else {
            self.settings.ring_size
        }
    }

    fn marker(size: f32) -> NodeSpec {
        NodeSpec::new("div", NodeParent::Layer)
            .attr("style.position", "fixed")
            .attr("style.left", "0")
            .attr("style.top", "0")
            .attr("style.width", format!("{size}px"))
            .attr("style.height", format!("{size}px"))
            .attr("style.borderRadius", "50%")
            .attr("style.pointerEvents", "none")
            .attr("style.mixBlendMode", "difference")
            .attr("style.willChange", "transform")
            .attr("style.opacity", "0")
    }
}

/// Transform centring a marker of `size` on `at`.
fn centred(at: Vec2, size: f32) -> String {
    let half = size / 2.0;
    format!("translate3d({:.1}px, {:.1}px, 0)", at.x - half, at.y - half)
}

impl Simulation for CursorTrailer {
    type Config = CursorSettings;
    const KIND: EngineKind = EngineKind::CursorTrailer;
    const NEEDS_SURFACE: bool = false;

    fn build(config: &CursorSettings, viewport: &Viewport) -> Self {
        let start = viewport.center();
        CursorTrailer {
            settings: config.clone(),
            ring: PointerFollower::new(config.trailer, start),
            pointer: start,
            visible: false,
            hover: false,
            dot_node: None,
            ring_node: None,
        }
    }

    fn setup(&mut self, host: &mut dyn NodeHost) {
        let accent = Rgba::ACCENT.css();
        self.dot_node = Some(OwnedNode::create(
            host,
            Self::marker(self.settings.dot_size).attr("style.background", accent.clone()),
        ));
        self.ring_node = Some(OwnedNode::create(
            host,
            Self::marker(self.settings.ring_size)
                .attr("style.border", format!("1px solid {accent}"))
                .attr("style.transition", "width 0.3s ease-out, height 0.3s ease-out"),
        ));
    }

    fn step(&mut self, frame: &FrameTime, signals: &SignalBundle) {
        let off = signals.pointer_x == OFF_SURFACE && signals.pointer_y == OFF_SURFACE;
        self.visible = !off;
        self.hover = signals.hover_active;
        if !off {
            self.pointer = signals.pointer();
            self.ring.set_target(self.pointer);
        }
        self.ring.step(frame.dt);
    }

    fn render(&self, _surface: Option<&mut dyn Surface>, host: &mut dyn NodeHost) {
        let (Some(dot), Some(ring)) = (&self.dot_node, &self.ring_node) else {
            return;
        };
        let opacity = if self.visible { "1" } else { "0" };
        dot.set(host, "style.transform", centred(self.pointer, self.settings.dot_size));
        dot.set(host, "style.opacity", opacity.to_string());

        let size = self.ring_size();
        ring.set(host, "style.transform", centred(self.ring.position(), size));
        ring.set(host, "style.width", format!("{size}px"));
        ring.set(host, "style.height", format!("{size}px"));
        ring.set(host, "style.borderWidth", if self.hover { "2px" } else { "1px" }.to_string());
        ring.set(host, "style.opacity", opacity.to_string());
    }

    fn teardown(&mut self, host: &mut dyn NodeHost) {
        for node in [self.dot_node.take(), self.ring_node.take()].into_iter().flatten() {
            node.release(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameSettings;
    use crate::controller::ActiveEngine;
    use crate::host::FrameQueue;
    use crate::types::Timestamp;

    fn activate(queue: &mut FrameQueue) -> ActiveEngine<CursorTrailer> {
        ActiveEngine::<CursorTrailer>::activate(
            &CursorSettings::default(),
            FrameSettings::default(),
            Viewport::new(800.0, 600.0, 1.0),
            None,
            queue,
        )
        .unwrap()
    }

    fn at(x: f32, y: f32) -> SignalBundle {
        SignalBundle {
            pointer_x: x,
            pointer_y: y,
            ..Default::default()
        }
    }

    fn transform(engine: &ActiveEngine<CursorTrailer>, node: &Option<OwnedNode>) -> String {
        let id = node.as_ref().unwrap().id();
        engine.nodes().attr(id, "style.transform").unwrap().to_string()
    }

    #[test]
    fn dot_is_instant_and_ring_trails() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        engine.tick(&mut queue, Timestamp::from_micros(0), &at(300.0, 200.0));

        let sim = engine.simulation();
        assert_eq!(transform(&engine, &sim.dot_node), "translate3d(296.0px, 196.0px, 0)");
        // one nominal frame from the centre (400, 300): 35% of the way
        assert_eq!(transform(&engine, &sim.ring_node), "translate3d(355.0px, 255.0px, 0)");
        assert!(sim.is_visible());

        for i in 1..120u64 {
            engine.tick(&mut queue, Timestamp::from_micros(i * 16_667), &at(300.0, 200.0));
        }
        assert!(engine.simulation().ring_position().distance(Vec2::new(300.0, 200.0)) < 0.01);
        engine.deactivate(&mut queue);
    }

    #[test]
    fn pointer_leave_hides_both_markers() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        engine.tick(&mut queue, Timestamp::from_micros(0), &at(10.0, 10.0));
        engine.tick(&mut queue, Timestamp::from_micros(16_667), &at(OFF_SURFACE, OFF_SURFACE));

        let sim = engine.simulation();
        assert!(!sim.is_visible());
        for node in [&sim.dot_node, &sim.ring_node] {
            let id = node.as_ref().unwrap().id();
            assert_eq!(engine.nodes().attr(id, "style.opacity"), Some("0"));
        }
        // the ring keeps heading for the last real position
        assert!(sim.ring_position().x > 10.0 && sim.ring_position().x < 400.0);
        engine.deactivate(&mut queue);
    }

    #[test]
    fn hover_grows_the_ring() {
        let mut queue = FrameQueue::new();
        let mut engine = activate(&mut queue);
        let hovering = SignalBundle {
            hover_active: true,
            ..at(100.0, 100.0)
        };
        engine.tick(&mut queue, Timestamp::from_micros(0), &hovering);
        let id = engine.simulation().ring_node.as_ref().unwrap().id();
        assert_eq!(engine.nodes().attr(id, "style.width"), Some("48px"));
        assert_eq!(engine.nodes().attr(id, "style.borderWidth"), Some("2px"));
        engine.deactivate(&mut queue);
    }

    #[test]
    fn deactivation_releases_both_markers() {
        let mut queue = FrameQueue::new();
        let engine = activate(&mut queue);
        assert_eq!(engine.nodes().live_count(), 2);
        let detached = engine.deactivate(&mut queue);
        assert_eq!(detached.nodes.live_count(), 0);
        assert_eq!(queue.listener_count(), 0);
    }
}
