// motion_core: procedural animation engines for the portfolio site.
// Rust owns every simulation; JS only replays draw commands and node patches.

mod clock;
mod config;
mod controller;
mod easing;
pub mod engines;
mod error;
mod follow;
mod host;
mod loader;
mod nodes;
mod reveal;
mod signals;
mod spring;
mod surface;
mod types;

use std::collections::BTreeMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use clock::{FrameClock, FrameTime, NOMINAL_DT};
pub use config::*;
pub use controller::{ActiveEngine, CompletionHook, Detached, FrameOutput, Mounted, Simulation};
pub use easing::{ease_in_out, keyframes, lerp, EasingType};
pub use error::EngineError;
pub use follow::{magnetic_target, parallax_target, FollowMode, PointerFollower};
pub use host::{FrameHost, FrameQueue, FrameRequest, ListenerId};
pub use loader::{AssetOutcome, LoadSettings, LoadTracker};
pub use nodes::{NodeHost, NodeId, NodeParent, NodePatch, NodeRegistry, NodeShape, NodeSpec, OwnedNode};
pub use reveal::{RadialReveal, RadialWipe, WipeFrame, WIPE_DURATION_MS};
pub use signals::{SignalHub, OFF_SURFACE};
pub use spring::Spring;
pub use surface::{DisplayList, DrawCommand, GradientStop, Paint, Surface};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

struct Slot {
    engine: Box<dyn Mounted>,
    viewport: Viewport,
    /// Slots mounted with their own size ignore stage resizes.
    follows_stage: bool,
    hover: bool,
}

/// Output of one slot for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotFrame {
    pub slot: u32,
    pub kind: EngineKind,
    pub backing: BackingSize,
    pub commands: Vec<DrawCommand>,
    pub patches: Vec<NodePatch>,
    pub completed: bool,
}

/// Everything the host applies for one display refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFrame {
    pub slots: Vec<SlotFrame>,
    pub wants_frame: bool,
}

/// One page's worth of mounted engines sharing a single signal hub.
/// Batch interface to minimize JS↔WASM crossings: one `frame` call per refresh.
#[wasm_bindgen]
pub struct Stage {
    signals: SignalHub,
    queue: FrameQueue,
    viewport: Viewport,
    slots: BTreeMap<u32, Slot>,
    next_slot: u32,
    loader: Option<LoadTracker>,
}

#[wasm_bindgen]
impl Stage {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Stage {
        Stage {
            signals: SignalHub::new(),
            queue: FrameQueue::new(),
            viewport: Viewport::new(width, height, device_pixel_ratio),
            slots: BTreeMap::new(),
            next_slot: 0,
            loader: None,
        }
    }

    /// Mount an engine at the stage size. Returns `undefined` when a canvas
    /// engine is mounted without a canvas.
    pub fn mount(&mut self, kind: &str, config_json: &str, has_surface: bool) -> Result<Option<u32>, JsValue> {
        self.try_mount(kind, config_json, has_surface, None).map_err(to_js)
    }

    /// Mount an engine on an element with its own size.
    pub fn mount_sized(
        &mut self,
        kind: &str,
        config_json: &str,
        has_surface: bool,
        width: f32,
        height: f32,
    ) -> Result<Option<u32>, JsValue> {
        let viewport = Viewport::new(width, height, self.viewport.device_pixel_ratio);
        self.try_mount(kind, config_json, has_surface, Some(viewport))
            .map_err(to_js)
    }

    /// Deactivate a slot. Returns the final release commands and patches as JSON.
    pub fn unmount(&mut self, slot: u32) -> Result<String, JsValue> {
        let frame = self.try_unmount(slot).map_err(to_js)?;
        serde_json::to_string(&frame).map_err(|e| to_js(e.into()))
    }

    /// Register a callback for the slot's terminal state. Fires at most once.
    pub fn on_complete(&mut self, slot: u32, callback: js_sys::Function) -> Result<(), JsValue> {
        let hook: CompletionHook = Box::new(move || {
            if let Err(err) = callback.call0(&JsValue::NULL) {
                log::warn!("completion callback threw: {:?}", err);
            }
        });
        self.try_on_complete(slot, hook).map_err(to_js)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.signals.pointer_move(x, y);
    }

    pub fn pointer_leave(&mut self) {
        self.signals.pointer_leave();
    }

    pub fn scroll(&mut self, offset: f32, now_ms: f64) {
        self.signals.scroll(offset, Timestamp::from_millis_f64(now_ms));
    }

    pub fn set_hover(&mut self, slot: u32, hover: bool) -> Result<(), JsValue> {
        self.try_set_hover(slot, hover).map_err(to_js)
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.signals.set_progress(progress);
    }

    pub fn complete_loading(&mut self) {
        self.signals.complete_loading();
    }

    /// Start counting `total` assets. Progress is fed to the signal hub on
    /// every frame until loading completes.
    pub fn track_assets(&mut self, total: u32, now_ms: f64) {
        self.loader = Some(LoadTracker::new(
            LoadSettings {
                total,
                safety_timeout_ms: loader::DEFAULT_SAFETY_TIMEOUT_MS,
            },
            Timestamp::from_millis_f64(now_ms),
        ));
    }

    pub fn asset_settled(&mut self, loaded: bool) {
        if let Some(loader) = self.loader.as_mut() {
            loader.record(if loaded { AssetOutcome::Loaded } else { AssetOutcome::Failed });
        }
    }

    /// New stage size. Slots mounted with their own size are left alone.
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.viewport = Viewport::new(width, height, device_pixel_ratio);
        for slot in self.slots.values_mut().filter(|s| s.follows_stage) {
            slot.viewport = self.viewport;
            slot.engine.resize(self.viewport);
        }
    }

    pub fn resize_slot(&mut self, slot: u32, width: f32, height: f32) -> Result<(), JsValue> {
        self.try_resize_slot(slot, width, height).map_err(to_js)
    }

    /// True while any slot wants another display refresh.
    pub fn wants_frame(&self) -> bool {
        self.queue.has_pending()
    }

    /// Tick every slot at `now_ms` and return the batched output as JSON.
    pub fn frame(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let frame = self.advance(Timestamp::from_millis_f64(now_ms));
        serde_json::to_string(&frame).map_err(|e| to_js(e.into()))
    }
}

impl Stage {
    pub fn try_mount(
        &mut self,
        kind: &str,
        config_json: &str,
        has_surface: bool,
        viewport: Option<Viewport>,
    ) -> Result<Option<u32>, EngineError> {
        let follows_stage = viewport.is_none();
        let viewport = viewport.unwrap_or(self.viewport);
        let surface = has_surface.then(DisplayList::new);
        let engine = match engines::mount_named(kind, config_json, viewport, surface, &mut self.queue) {
            Ok(engine) => engine,
            Err(EngineError::SurfaceUnavailable(kind)) => {
                log::warn!("{:?}: not mounted, the host has no canvas for it", kind);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let id = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(
            id,
            Slot {
                engine,
                viewport,
                follows_stage,
                hover: false,
            },
        );
        Ok(Some(id))
    }

    pub fn try_unmount(&mut self, slot: u32) -> Result<SlotFrame, EngineError> {
        let entry = self.slots.remove(&slot).ok_or(EngineError::UnknownSlot(slot))?;
        let kind = entry.engine.kind();
        let backing = entry.engine.backing();
        let out = entry.engine.deactivate(&mut self.queue);
        log::info!("{:?}: unmounted from slot {}", kind, slot);
        Ok(SlotFrame {
            slot,
            kind,
            backing,
            commands: out.commands,
            patches: out.patches,
            completed: out.finished,
        })
    }

    pub fn try_on_complete(&mut self, slot: u32, hook: CompletionHook) -> Result<(), EngineError> {
        let entry = self.slots.get_mut(&slot).ok_or(EngineError::UnknownSlot(slot))?;
        entry.engine.set_completion_hook(hook);
        Ok(())
    }

    pub fn try_set_hover(&mut self, slot: u32, hover: bool) -> Result<(), EngineError> {
        let entry = self.slots.get_mut(&slot).ok_or(EngineError::UnknownSlot(slot))?;
        entry.hover = hover;
        Ok(())
    }

    /// A resize for a slot that is already gone is ignored.
    pub fn try_resize_slot(&mut self, slot: u32, width: f32, height: f32) -> Result<(), EngineError> {
        let Some(entry) = self.slots.get_mut(&slot) else {
            log::warn!("resize for unmounted slot {} ignored", slot);
            return Ok(());
        };
        entry.viewport = Viewport::new(width, height, entry.viewport.device_pixel_ratio);
        entry.follows_stage = false;
        entry.engine.resize(entry.viewport);
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Tick every slot once and collect what they produced.
    pub fn advance(&mut self, now: Timestamp) -> StageFrame {
        if let Some(loader) = self.loader.as_mut() {
            loader.poll(now);
            self.signals.set_progress(loader.progress());
            if loader.is_complete() {
                self.signals.complete_loading();
                self.loader = None;
            }
        }

        let base = self.signals.snapshot(now);
        let mut slots = Vec::with_capacity(self.slots.len());
        for (&id, slot) in self.slots.iter_mut() {
            let signals = SignalBundle {
                hover_active: slot.hover,
                ..base
            };
            slot.engine.tick(&mut self.queue, now, &signals);
            let out = slot.engine.drain();
            slots.push(SlotFrame {
                slot: id,
                kind: slot.engine.kind(),
                backing: slot.engine.backing(),
                commands: out.commands,
                patches: out.patches,
                completed: out.finished,
            });
        }
        StageFrame {
            slots,
            wants_frame: self.queue.has_pending(),
        }
    }
}

/// Spring-smoothed offset for one element: hero parallax or a magnetic button.
#[wasm_bindgen]
pub struct Follower {
    inner: PointerFollower,
    clock: FrameClock,
}

#[wasm_bindgen]
impl Follower {
    /// Backdrop drifting against the pointer.
    pub fn parallax() -> Follower {
        Follower::with_mode(FollowMode::PARALLAX)
    }

    /// Element pulled toward the pointer.
    pub fn magnetic() -> Follower {
        Follower::with_mode(FollowMode::MAGNETIC)
    }

    /// Aim at the parallax offset for a pointer in a `width` x `height` viewport.
    pub fn aim_parallax(&mut self, x: f32, y: f32, width: f32, height: f32, range: f32) {
        let viewport = Viewport::new(width, height, 1.0);
        self.inner
            .set_target(parallax_target(glam::Vec2::new(x, y), &viewport, range));
    }

    /// Aim `pull` of the way from the element centre to the pointer.
    pub fn aim_magnetic(&mut self, x: f32, y: f32, center_x: f32, center_y: f32, pull: f32) {
        self.inner.set_target(magnetic_target(
            glam::Vec2::new(x, y),
            glam::Vec2::new(center_x, center_y),
            pull,
        ));
    }

    /// Spring back to rest.
    pub fn release(&mut self) {
        self.inner.set_target(glam::Vec2::ZERO);
    }

    pub fn update(&mut self, now_ms: f64) {
        let frame = self.clock.tick(Timestamp::from_millis_f64(now_ms));
        self.inner.step(frame.dt);
    }

    pub fn x(&self) -> f32 {
        self.inner.position().x
    }

    pub fn y(&self) -> f32 {
        self.inner.position().y
    }
}

impl Follower {
    fn with_mode(mode: FollowMode) -> Follower {
        Follower {
            inner: PointerFollower::new(mode, glam::Vec2::ZERO),
            clock: FrameClock::new(FrameSettings::default()),
        }
    }
}

/// Pointer-following reveal mask for one element.
#[wasm_bindgen]
pub struct Spotlight {
    inner: RadialReveal,
}

#[wasm_bindgen]
impl Spotlight {
    #[wasm_bindgen(constructor)]
    pub fn new(radius: f32) -> Spotlight {
        Spotlight {
            inner: RadialReveal::new(radius),
        }
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.inner.set_pointer(x, y);
    }

    pub fn clear_pointer(&mut self) {
        self.inner.clear_pointer();
    }

    /// CSS `mask-image` for the highlighted layer.
    pub fn mask(&self) -> String {
        self.inner.css_mask()
    }
}

#[derive(Serialize)]
struct WipeSample {
    #[serde(flatten)]
    frame: WipeFrame,
    mask: Option<String>,
}

/// Click-centred circular wipe used for the language switch.
#[wasm_bindgen]
pub struct LanguageWipe {
    inner: RadialWipe,
}

#[wasm_bindgen]
impl LanguageWipe {
    #[wasm_bindgen(constructor)]
    pub fn new() -> LanguageWipe {
        LanguageWipe {
            inner: RadialWipe::default(),
        }
    }

    /// Returns false if a wipe is already running.
    pub fn start(&mut self, x: f32, y: f32, now_ms: f64) -> bool {
        self.inner.start(x, y, Timestamp::from_millis_f64(now_ms))
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// JSON `{progress, midpoint, finished, mask}`, or `undefined` when idle.
    pub fn sample(&mut self, now_ms: f64) -> Result<Option<String>, JsValue> {
        let Some(frame) = self.inner.sample(Timestamp::from_millis_f64(now_ms)) else {
            return Ok(None);
        };
        let sample = WipeSample {
            frame,
            mask: self.inner.css_mask(),
        };
        serde_json::to_string(&sample)
            .map(Some)
            .map_err(|e| to_js(e.into()))
    }
}

impl Default for LanguageWipe {
    fn default() -> Self {
        Self::new()
    }
}
