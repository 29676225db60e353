// Strong typing over strings. Newtypes for timestamps, viewport sizes and colors.

use serde::{Deserialize, Serialize};

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// From a host high-resolution timestamp (fractional milliseconds).
    /// Negative and non-finite inputs collapse to zero.
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp((ms * 1000.0).round() as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

/// Logical viewport of a mount point, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_dpr")]
    pub device_pixel_ratio: f32,
}

fn default_dpr() -> f32 {
    1.0
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Viewport {
            width: sanitize_extent(width),
            height: sanitize_extent(height),
            device_pixel_ratio: if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Backing-store size for this viewport. The device pixel ratio is capped
    /// at `max_dpr`, then multiplied by `resolution_scale` (< 1.0 renders at
    /// reduced internal resolution and lets the host upscale).
    pub fn backing(&self, max_dpr: f32, resolution_scale: f32) -> BackingSize {
        let scale = self.device_pixel_ratio.min(max_dpr.max(0.1)) * resolution_scale.max(0.05);
        BackingSize {
            width: (self.width * scale).round() as u32,
            height: (self.height * scale).round() as u32,
            scale,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::new(1280.0, 720.0, 1.0)
    }
}

fn sanitize_extent(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Pixel dimensions of a canvas backing store plus the logical→pixel scale
/// the host must apply to its 2D context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackingSize {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

/// sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    /// Lime accent used across the site.
    pub const ACCENT: Rgba = Rgba::rgb(212, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Rgba {
            a: if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 },
            ..self
        }
    }

    /// Hue in degrees, saturation and lightness in percent.
    /// CSS color string for node styles.
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }

    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let s = (s / 100.0).clamp(0.0, 1.0);
        let l = (l / 100.0).clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba::rgb(to_u8(r1), to_u8(g1), to_u8(b1))
    }
}

/// Read-only snapshot of the external signals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub pointer_x: f32,
    pub pointer_y: f32,
    /// Raw scroll velocity in px/s. Engines smooth it themselves.
    pub scroll_velocity: f32,
    pub hover_active: bool,
    /// Wall-clock seconds since the hub started.
    pub elapsed: f64,
    /// Asset-load progress, 0..=100.
    pub progress: u8,
    /// Explicit completion event from the loader.
    pub load_complete: bool,
}

impl SignalBundle {
    pub fn pointer(&self) -> glam::Vec2 {
        glam::Vec2::new(self.pointer_x, self.pointer_y)
    }

    /// Progress with the completion event folded in.
    pub fn effective_progress(&self) -> u8 {
        if self.load_complete {
            100
        } else {
            self.progress.min(100)
        }
    }
}

impl Default for SignalBundle {
    fn default() -> Self {
        SignalBundle {
            pointer_x: 0.0,
            pointer_y: 0.0,
            scroll_velocity: 0.0,
            hover_active: false,
            elapsed: 0.0,
            progress: 0,
            load_complete: false,
        }
    }
}

/// Which procedural engine a mount point runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Aurora,
    Clouds,
    Fireflies,
    Butterflies,
    FloatingWorld,
    Preloader,
    Starfield,
    ServiceCard,
    CursorTrailer,
}

impl EngineKind {
    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
    }
}
