// Volumetric cloud field built from retained nodes: puff divs behind an SVG
// displacement filter. Layers drift at depth-dependent speeds and loop by exact
// modulo; every cloud is drawn twice, one wrap period apart, from one layout.

use std::f32::consts::PI;

use glam::Vec2;

use crate::clock::FrameTime;
use crate::config::{CloudSettings, CloudType};
use crate::controller::Simulation;
use crate::nodes::{NodeHost, NodeId, NodeParent, NodeSpec, OwnedNode};
use crate::surface::Surface;
use crate::types::{EngineKind, SignalBundle, Viewport};

/// Opacity ramp at the outer ends of the two-copy span, in viewport percent.
const FADE_SPAN: f32 = 10.0;

/// Common period of the flow-driven skew (`sin(flow * 0.002)`) and detail
/// sway (`sin(flow * 0.01)`).
const FLOW_PERIOD: f32 = 1000.0 * PI;

/// One puff of a cloud, in vmin relative to the cloud box.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PuffLayout {
    size: Vec2,
    origin: Vec2,
    corner_pct: f32,
    rotation_deg: f32,
}

/// Immutable per-cloud layout, drawn once from the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudLayout {
    pub kind: CloudType,
    /// Vertical position in viewport percent.
    pub top: f32,
    pub scale: f32,
    pub noise_aspect: f32,
    /// Nearness in (0, 1]; 1 is closest to the viewer.
    pub z: f32,
    pub layer: usize,
    /// Start position on the loop, in viewport percent.
    pub origin: f32,
    pub noise_seed: u32,
    tint: (u8, u8, u8),
    puffs: Vec<PuffLayout>,
}

impl CloudLayout {
    fn generate(rng: &mut fastrand::Rng, index: u32, settings: &CloudSettings) -> Self {
        let roll = rng.f32();
        let kind = if roll < 0.4 {
            CloudType::Dense
        } else if roll < 0.8 {
            CloudType::Layered
        } else {
            CloudType::Wispy
        };
        let alt = rng.f32();
        let size = rng.f32();
        let (top, scale, noise_aspect) = match kind {
            CloudType::Wispy => (5.0 + alt * 15.0, 0.5 + size * 0.4, 2.0),
            CloudType::Layered => (15.0 + alt * 20.0, 0.8 + size * 1.0, 2.5),
            CloudType::Dense => (10.0 + alt * 35.0, 0.7 + size * 1.3, 1.1),
        };
        let z = ((40.0 - top) / 40.0).max(0.1);
        let layers = settings.depth_layers.max(1) as usize;
        let layer = ((z * layers as f32) as usize).min(layers - 1);

        let blue = (1.0 - z) * 15.0;
        let tint = (
            (255.0 - blue).round() as u8,
            (255.0 - blue / 2.0).round() as u8,
            255,
        );

        let base = 14.0 * scale;
        let mut cursor = Vec2::splat(50.0);
        let puffs = (0..settings.puffs_per_cloud)
            .map(|_| {
                let r = rng.f32();
                let aspect = 0.6 + r * 1.4;
                let size = Vec2::new(base * aspect, base / aspect);
                let puff = PuffLayout {
                    size,
                    origin: cursor - size / 2.0,
                    corner_pct: 30.0 + r * 40.0,
                    rotation_deg: r * 360.0,
                };
                cursor.x += (rng.f32() - 0.3) * base * 0.7;
                cursor.y += (rng.f32() - 0.5) * base * 0.3;
                puff
            })
            .collect();

        CloudLayout {
            kind,
            top,
            scale,
            noise_aspect,
            z,
            layer,
            origin: index as f32 / settings.count.max(1) as f32 * settings.wrap_period,
            noise_seed: rng.u32(0..10_000),
            tint,
            puffs,
        }
    }

    fn color(&self) -> String {
        format!("rgb({}, {}, {})", self.tint.0, self.tint.1, self.tint.2)
    }

    fn frequency(&self) -> f32 {
        0.012 / (self.scale * 0.9)
    }
}

/// Drift speed of a depth layer in viewport percent per second. Nearer layers
/// move faster.
pub fn layer_speed(layer: usize, layers: usize, speed_scale: f32) -> f32 {
    let depth = (layer as f32 + 0.5) / layers.max(1) as f32;
    speed_scale * (0.3 + depth * 0.7)
}

/// Centre (viewport percent) of the original and its wrap clone for a cloud
/// whose layer has travelled `offset`. The original covers
/// `[margin, period + margin)` and the clone trails it by one period, so
/// while the original leaves past the right edge the clone is already
/// crossing the left one.
pub fn placement(origin: f32, offset: f32, period: f32, margin: f32) -> (f32, f32) {
    let x = (origin + offset).rem_euclid(period) + margin;
    (x, x - period)
}

/// Opacity multiplier from position. Only the outer ends of the two-copy
/// span fade, where a copy is about to jump by one period.
pub fn edge_fade(x: f32, period: f32, margin: f32) -> f32 {
    let fade_in = (x - (margin - period)) / FADE_SPAN;
    let fade_out = (period + margin - x) / FADE_SPAN;
    fade_in.min(fade_out).clamp(0.0, 1.0)
}

/// Fold bound for the flow accumulators: `bound` rounded to a whole number
/// of flow periods, so folding never moves the skew or the sway.
pub fn flow_fold(bound: f32) -> f32 {
    (bound / FLOW_PERIOD).round().max(1.0) * FLOW_PERIOD
}

fn flow_skew(flow: f32) -> f32 {
    (flow * 0.002).sin() * 4.0
}

fn flow_sway(flow: f32) -> f32 {
    (flow * 0.01).sin() * 2.0
}

/// Retained nodes of one cloud. `filter` owns its primitives; the offsets are
/// kept for per-frame updates.
struct CloudNodes {
    filter: OwnedNode,
    base_offset: NodeId,
    detail_offset: NodeId,
    original: OwnedNode,
    clone: OwnedNode,
}

pub struct Clouds {
    settings: CloudSettings,
    layouts: Vec<CloudLayout>,
    layer_offsets: Vec<f32>,
    flow: Vec<f32>,
    nodes: Vec<CloudNodes>,
}

impl Clouds {
    pub fn layouts(&self) -> &[CloudLayout] {
        &self.layouts
    }

    pub fn layer_offsets(&self) -> &[f32] {
        &self.layer_offsets
    }

    pub fn flow_offsets(&self) -> &[f32] {
        &self.flow
    }

    /// (original, clone) container ids per cloud while set up.
    pub fn containers(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes.iter().map(|n| (n.original.id(), n.clone.id())).collect()
    }

    fn filter_id(&self, index: usize) -> String {
        format!("{}-shred-{}", self.settings.id_prefix, index)
    }

    fn build_filter(&self, host: &mut dyn NodeHost, index: usize) -> (OwnedNode, NodeId, NodeId) {
        let layout = &self.layouts[index];
        let freq = layout.frequency();
        let filter = OwnedNode::create(
            host,
            NodeSpec::new("filter", NodeParent::Defs)
                .attr("id", self.filter_id(index))
                .attr("filterUnits", "userSpaceOnUse")
                .attr("primitiveUnits", "userSpaceOnUse")
                .attr("x", "-200vmin")
                .attr("y", "-200vmin")
                .attr("width", "500vmin")
                .attr("height", "500vmin")
                .attr("color-interpolation-filters", "sRGB"),
        );
        let parent = NodeParent::Node(filter.id());

        host.create(
            NodeSpec::new("feTurbulence", parent)
                .attr("type", "fractalNoise")
                .attr("baseFrequency", format!("{} {}", freq, freq * layout.noise_aspect))
                .attr("numOctaves", "5")
                .attr("seed", layout.noise_seed.to_string())
                .attr("result", "bRaw"),
        );
        let base_offset = host.create(
            NodeSpec::new("feOffset", parent)
                .attr("in", "bRaw")
                .attr("dx", "0")
                .attr("dy", "0")
                .attr("result", "bShift"),
        );
        host.create(
            NodeSpec::new("feTile", parent)
                .attr("in", "bShift")
                .attr("result", "bTiled"),
        );
        host.create(
            NodeSpec::new("feTurbulence", parent)
                .attr("type", "fractalNoise")
                .attr("baseFrequency", (freq * 4.0).to_string())
                .attr("numOctaves", "2")
                .attr("seed", (layout.noise_seed + 1).to_string())
                .attr("result", "dRaw"),
        );
        let detail_offset = host.create(
            NodeSpec::new("feOffset", parent)
                .attr("in", "dRaw")
                .attr("dx", "0")
                .attr("dy", "0")
                .attr("result", "dShift"),
        );
        host.create(
            NodeSpec::new("feTile", parent)
                .attr("in", "dShift")
                .attr("result", "dTiled"),
        );
        host.create(
            NodeSpec::new("feComposite", parent)
                .attr("in", "bTiled")
                .attr("in2", "dTiled")
                .attr("operator", "arithmetic")
                .attr("k2", "0.8")
                .attr("k3", "0.2")
                .attr("result", "mix"),
        );
        host.create(
            NodeSpec::new("feColorMatrix", parent)
                .attr("in", "mix")
                .attr("type", "matrix")
                .attr("values", "1 0 0 0 0  0 1 0 0 0  0 0 1 0 0  0 0 0 10 -3")
                .attr("result", "edge"),
        );
        host.create(
            NodeSpec::new("feDisplacementMap", parent)
                .attr("in", "SourceGraphic")
                .attr("in2", "edge")
                .attr("scale", (90.0 * layout.scale).to_string())
                .attr("xChannelSelector", "R")
                .attr("yChannelSelector", "G"),
        );
        host.create(
            NodeSpec::new("feGaussianBlur", parent)
                .attr("stdDeviation", ((1.5 - layout.z) * 2.0 + 1.0).to_string()),
        );
        (filter, base_offset, detail_offset)
    }

    /// One container with its puffs. Original and clone both come from here.
    fn build_container(&self, host: &mut dyn NodeHost, index: usize) -> OwnedNode {
        let layout = &self.layouts[index];
        let container = OwnedNode::create(
            host,
            NodeSpec::new("div", NodeParent::Layer)
                .attr("style.position", "absolute")
                .attr("style.width", "100vmin")
                .attr("style.height", "100vmin")
                .attr("style.pointerEvents", "none")
                .attr("style.willChange", "transform, opacity, left")
                .attr("style.filter", format!("url(#{})", self.filter_id(index)))
                .attr("style.mixBlendMode", "overlay"),
        );
        let background = format!(
            "radial-gradient(circle at center, {} 0%, transparent 80%)",
            layout.color()
        );
        let opacity = (0.4 + (1.0 - layout.z) * 0.5).to_string();
        for puff in &layout.puffs {
            host.create(
                NodeSpec::new("div", NodeParent::Node(container.id()))
                    .attr("style.position", "absolute")
                    .attr("style.width", format!("{}vmin", puff.size.x))
                    .attr("style.height", format!("{}vmin", puff.size.y))
                    .attr("style.left", format!("{}vmin", puff.origin.x))
                    .attr("style.top", format!("{}vmin", puff.origin.y))
                    .attr(
                        "style.borderRadius",
                        format!("{0}% {0}%", puff.corner_pct),
                    )
                    .attr("style.background", background.clone())
                    .attr("style.opacity", opacity.clone())
                    .attr("style.transform", format!("rotate({}deg)", puff.rotation_deg)),
            );
        }
        container
    }

    fn place(&self, host: &mut dyn NodeHost, node: &OwnedNode, x: f32, layout: &CloudLayout, skew: f32) {
        node.set(host, "style.left", format!("{:.2}%", x));
        node.set(host, "style.top", format!("{:.2}%", layout.top));
        node.set(
            host,
            "style.opacity",
            format!(
                "{:.3}",
                edge_fade(x, self.settings.wrap_period, self.settings.margin) * (0.2 + layout.z * 0.7)
            ),
        );
        node.set(
            host,
            "style.transform",
            format!("translate(-50%, -50%) skewX({:.2}deg)", skew),
        );
    }
}

impl Simulation for Clouds {
    type Config = CloudSettings;
    const KIND: EngineKind = EngineKind::Clouds;
    const NEEDS_SURFACE: bool = false;

    fn build(config: &CloudSettings, _viewport: &Viewport) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let layouts: Vec<CloudLayout> = (0..config.count)
            .map(|i| CloudLayout::generate(&mut rng, i, config))
            .collect();
        let flow = layouts.iter().map(|_| rng.f32() * 1000.0).collect();
        Clouds {
            settings: config.clone(),
            layouts,
            layer_offsets: vec![0.0; config.depth_layers.max(1) as usize],
            flow,
            nodes: Vec::new(),
        }
    }

    fn setup(&mut self, host: &mut dyn NodeHost) {
        let nodes = (0..self.layouts.len())
            .map(|i| {
                let (filter, base_offset, detail_offset) = self.build_filter(host, i);
                CloudNodes {
                    filter,
                    base_offset,
                    detail_offset,
                    original: self.build_container(host, i),
                    clone: self.build_container(host, i),
                }
            })
            .collect();
        self.nodes = nodes;
    }

    fn step(&mut self, frame: &FrameTime, _signals: &SignalBundle) {
        let s = &self.settings;
        let layers = self.layer_offsets.len();
        for (i, offset) in self.layer_offsets.iter_mut().enumerate() {
            *offset = (*offset + layer_speed(i, layers, s.speed_scale) * frame.dt).rem_euclid(s.wrap_period);
        }
        let fold = flow_fold(s.flow_wrap);
        for flow in &mut self.flow {
            *flow -= frame.dt * s.flow_rate;
            if flow.abs() > fold {
                *flow %= fold;
            }
        }
    }

    fn render(&self, _surface: Option<&mut dyn Surface>, host: &mut dyn NodeHost) {
        let s = &self.settings;
        for ((layout, nodes), flow) in self.layouts.iter().zip(&self.nodes).zip(&self.flow) {
            host.set_attr(nodes.base_offset, "dx", format!("{:.1}", flow));
            host.set_attr(nodes.detail_offset, "dx", format!("{:.1}", flow * 1.4));
            host.set_attr(nodes.detail_offset, "dy", format!("{:.1}", flow_sway(*flow)));

            let offset = self.layer_offsets[layout.layer];
            let (x, clone_x) = placement(layout.origin, offset, s.wrap_period, s.margin);
            let skew = flow_skew(*flow);
            self.place(host, &nodes.original, x, layout, skew);
            self.place(host, &nodes.clone, clone_x, layout, skew);
        }
    }

    fn teardown(&mut self, host: &mut dyn NodeHost) {
        for nodes in self.nodes.drain(..) {
            nodes.original.release(host);
            nodes.clone.release(host);
            nodes.filter.release(host);
        }
    }
}
