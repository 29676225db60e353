// Engine configuration passed from JS as JSON. Every field has a default so
// `{}` is a valid config for every engine. Rates are per second, not per frame.

use serde::{Deserialize, Serialize};

use crate::easing::EasingType;
use crate::follow::FollowMode;

/// Frame-loop settings shared by every engine controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSettings {
    /// Largest dt (seconds) accepted from the clock.
    #[serde(default = "default_max_dt")]
    pub max_dt: f32,
    /// Nominal dt substituted when the real one is over `max_dt`.
    #[serde(default = "default_fallback_dt")]
    pub fallback_dt: f32,
    /// Cap on device pixel ratio for backing stores.
    #[serde(default = "default_max_dpr")]
    pub max_device_pixel_ratio: f32,
}

fn default_max_dt() -> f32 {
    0.1
}

fn default_fallback_dt() -> f32 {
    1.0 / 60.0
}

fn default_max_dpr() -> f32 {
    2.0
}

impl Default for FrameSettings {
    fn default() -> Self {
        FrameSettings {
            max_dt: default_max_dt(),
            fallback_dt: default_fallback_dt(),
            max_device_pixel_ratio: default_max_dpr(),
        }
    }
}

/// Wrapper used to pull the optional `frame` block out of a mount config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameEnvelope {
    #[serde(default)]
    pub frame: FrameSettings,
}

/// Ray-casting aurora curtain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuroraSettings {
    pub layers: u32,
    /// Column width in logical pixels.
    pub ray_width: f32,
    /// Fraction of the surface height the curtain may reach.
    pub height_fraction: f32,
    /// Normalized noise below this draws nothing.
    pub threshold: f32,
    /// Exponent applied to noise for opacity; sharpens peaks.
    pub peak_power: i32,
    pub base_alpha: f32,
    /// Phase advance per second with no scroll.
    pub base_speed: f32,
    /// Multiplier from smoothed |scroll velocity| (px/s) to extra phase per nominal frame.
    pub boost_gain: f32,
    /// Ceiling on the scroll-derived boost.
    pub boost_max: f32,
    pub spring_stiffness: f32,
    /// Internal render resolution relative to the capped device pixel ratio.
    pub resolution_scale: f32,
}

impl Default for AuroraSettings {
    fn default() -> Self {
        AuroraSettings {
            layers: 6,
            ray_width: 12.0,
            height_fraction: 0.7,
            threshold: 0.35,
            peak_power: 4,
            base_alpha: 0.25,
            base_speed: 1.8,
            boost_gain: 0.0001,
            boost_max: 0.04,
            spring_stiffness: 40.0,
            resolution_scale: 0.5,
        }
    }
}

/// Qualitative cloud type; fixes aspect ratio and altitude band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudType {
    Dense,
    Layered,
    Wispy,
}

/// Volumetric cloud field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub seed: u64,
    pub count: u32,
    pub puffs_per_cloud: u32,
    pub depth_layers: u32,
    /// Horizontal speed scale, in viewport-percent per second.
    pub speed_scale: f32,
    /// Virtual travel (viewport percent) after which a layer repeats.
    pub wrap_period: f32,
    /// How far past the right edge (viewport percent) a cloud travels before
    /// its wrap clone, trailing by one period, is the only copy in view.
    /// Must cover half a cloud's width.
    pub margin: f32,
    /// Internal noise offset advance per second.
    pub flow_rate: f32,
    /// Accumulators are folded back near this bound, rounded to a whole
    /// number of flow periods.
    pub flow_wrap: f32,
    /// Prefix for filter element ids; must be unique per mounted field.
    pub id_prefix: String,
}

impl Default for CloudSettings {
    fn default() -> Self {
        CloudSettings {
            seed: 0x6e65_7068,
            count: 7,
            puffs_per_cloud: 8,
            depth_layers: 3,
            speed_scale: 0.9,
            wrap_period: 100.0,
            margin: 40.0,
            flow_rate: 12.0,
            flow_wrap: 10_000.0,
            id_prefix: "nephele".to_string(),
        }
    }
}

/// Waypoint + orbit firefly swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireflySettings {
    pub seed: u64,
    pub count: u32,
    pub waypoints: u32,
    /// Waypoint-segment progress per second, sampled uniformly in range.
    pub move_speed: (f32, f32),
    /// Orbit angular speed in radians per second.
    pub orbit_speed: (f32, f32),
    /// Orbit radius as a fraction of surface width.
    pub orbit_radius_fraction: f32,
    /// Flash cycles per second.
    pub flash_rate: (f32, f32),
    /// First dwell before any flash, milliseconds.
    pub initial_delay_ms: (f32, f32),
    /// Dwell between flashes, milliseconds.
    pub redelay_ms: (f32, f32),
    /// Cycle fraction spent rising.
    pub rise: f32,
    /// Cycle fraction at which the fall reaches zero.
    pub fall_end: f32,
    pub size_fraction: f32,
    pub min_size: f32,
}

impl Default for FireflySettings {
    fn default() -> Self {
        FireflySettings {
            seed: 0x666c_79,
            count: 45,
            waypoints: 20,
            move_speed: (0.03, 0.09),
            orbit_speed: (0.12, 0.30),
            orbit_radius_fraction: 0.1,
            flash_rate: (0.36, 0.9),
            initial_delay_ms: (0.0, 5000.0),
            redelay_ms: (500.0, 6500.0),
            rise: 0.05,
            fall_end: 0.3,
            size_fraction: 0.0035,
            min_size: 1.5,
        }
    }
}

/// One butterfly's frame periods, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButterflyUnit {
    /// Revolution of the radial frame.
    pub radial_period: f32,
    /// Revolution of the stretched oval frame.
    pub spin_period: f32,
    /// Full down/up wing beat.
    pub flap_period: f32,
}

/// Nested-rotation butterflies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButterflySettings {
    /// Full there-and-back cycle of the positional drift.
    pub drift_period: f32,
    pub units: Vec<ButterflyUnit>,
    pub cluster_scale: f32,
    pub squish: f32,
    pub oval_stretch: f32,
    /// Radius of the radial frame, in unscaled pixels.
    pub orbit_offset: f32,
}

impl Default for ButterflySettings {
    fn default() -> Self {
        ButterflySettings {
            drift_period: 25.4,
            units: vec![
                ButterflyUnit {
                    radial_period: 10.3,
                    spin_period: 1.23,
                    flap_period: 0.302,
                },
                ButterflyUnit {
                    radial_period: 15.7,
                    spin_period: 1.53,
                    flap_period: 0.298,
                },
            ],
            cluster_scale: 0.35,
            squish: 0.3,
            oval_stretch: 3.3,
            orbit_offset: 80.0,
        }
    }
}

/// Image sprite drifting across the top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftSpec {
    pub src: String,
    /// Width in viewport-width percent.
    pub width_vw: f32,
    /// Seconds per crossing.
    pub duration: f32,
    /// Negative delay starts the loop mid-flight.
    pub delay: f32,
    /// Top offset in viewport-height percent.
    pub top: f32,
    pub rotate_deg: f32,
    /// true: left to right.
    pub reverse: bool,
    /// Timing curve of one crossing.
    #[serde(default)]
    pub easing: EasingType,
}

impl CraftSpec {
    fn new(src: &str, width_vw: f32, duration: f32, delay: f32, top: f32, rotate_deg: f32, reverse: bool) -> Self {
        CraftSpec {
            src: src.to_string(),
            width_vw,
            duration,
            delay,
            top,
            rotate_deg,
            reverse,
            easing: EasingType::Linear,
        }
    }
}

/// Floating craft plus bird flock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatingWorldSettings {
    pub seed: u64,
    pub bird_count: u32,
    /// Spawn band for birds as a fraction of height.
    pub spawn_band: f32,
    /// Birds leaving this band wrap vertically.
    pub wrap_band: f32,
    /// Horizontal speed in px/s.
    pub bird_speed: (f32, f32),
    pub vertical_drift: f32,
    /// Wing phase advance in radians per second.
    pub wing_rate: f32,
    pub flock_radius: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub base_url: String,
    pub craft: Vec<CraftSpec>,
}

impl Default for FloatingWorldSettings {
    fn default() -> Self {
        FloatingWorldSettings {
            seed: 0x776f_726c_64,
            bird_count: 18,
            spawn_band: 0.35,
            wrap_band: 0.4,
            bird_speed: (36.0, 108.0),
            vertical_drift: 15.0,
            wing_rate: 4.8,
            flock_radius: 80.0,
            alignment: 0.6,
            cohesion: 0.02,
            base_url: String::new(),
            craft: vec![
                CraftSpec::new("baloon_large.png", 5.0, 240.0, -60.0, 12.0, 2.0, true),
                CraftSpec::new("baloon_large2.png", 4.0, 300.0, -150.0, 22.0, -3.0, true),
                CraftSpec::new("baloon_medium.png", 3.0, 210.0, -20.0, 8.0, 1.0, true),
                CraftSpec::new("baloon_small.png", 2.0, 160.0, -80.0, 25.0, 4.0, true),
                CraftSpec::new("ship_back.png", 8.0, 380.0, -190.0, 18.0, 0.0, true),
                CraftSpec::new("ship_far.png", 4.0, 450.0, -220.0, 14.0, -1.0, false),
                CraftSpec::new("ship_front.png", 12.0, 340.0, -100.0, 24.0, 1.0, false),
                CraftSpec::new("ship_very_far.png", 2.5, 550.0, -270.0, 6.0, 0.0, false),
            ],
        }
    }
}

/// Orbit → implosion → flash preloader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloaderSettings {
    pub seed: u64,
    pub particle_count: u32,
    /// Used instead of `particle_count` on narrow viewports.
    pub compact_particle_count: u32,
    pub compact_width: f32,
    /// Orbit-phase pull per nominal frame, scaled by progress.
    pub orbit_gain: f32,
    pub orbit_damping: f32,
    pub implode_force: f32,
    pub implode_softening: f32,
    pub implode_damping: f32,
    /// Particles closer than this while imploding are recycled to the shell.
    pub implode_recycle_radius: f32,
    /// Radius inside which imploding particles start gaining size.
    pub mass_radius: f32,
    /// flashIntensity increase per second while imploding.
    pub flash_rate: f32,
    /// Accent wash starts once intensity passes this.
    pub accent_threshold: f32,
    /// White wash starts once intensity passes this; core glyph hides.
    pub white_threshold: f32,
    pub link_distance: f32,
}

impl Default for PreloaderSettings {
    fn default() -> Self {
        PreloaderSettings {
            seed: 0x7072_656c,
            particle_count: 150,
            compact_particle_count: 60,
            compact_width: 768.0,
            orbit_gain: 0.05,
            orbit_damping: 0.95,
            implode_force: 2500.0,
            implode_softening: 10.0,
            implode_damping: 0.98,
            implode_recycle_radius: 4.0,
            mass_radius: 100.0,
            flash_rate: 3.0,
            accent_threshold: 0.0,
            white_threshold: 0.5,
            link_distance: 80.0,
        }
    }
}

/// Perspective starfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldSettings {
    pub seed: u64,
    pub count: u32,
    pub max_depth: f32,
    pub near_plane: f32,
    /// Depth units per second at rest.
    pub cruise_speed: f32,
    /// Depth units per second while hovered.
    pub warp_speed: f32,
    pub focal_length: f32,
    pub max_radius: f32,
    /// Alpha of the partial clear; lower leaves longer trails.
    pub trail_alpha: f32,
    /// Depth offset used to draw warp streaks.
    pub streak_depth: f32,
}

impl Default for StarfieldSettings {
    fn default() -> Self {
        StarfieldSettings {
            seed: 0x7374_6172,
            count: 400,
            max_depth: 2000.0,
            near_plane: 1.0,
            cruise_speed: 120.0,
            warp_speed: 2400.0,
            focal_length: 500.0,
            max_radius: 3.0,
            trail_alpha: 0.3,
            streak_depth: 50.0,
        }
    }
}

/// Which mini-animation a service card runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardKernel {
    #[default]
    Matrix,
    Waves,
    Plexus,
    Circuitry,
    Orbit,
    Scanner,
}

/// Hover-reactive service card canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceCardSettings {
    pub seed: u64,
    pub kernel: CardKernel,
    /// Narrow-screen variant: fewer agents, thicker strokes, higher contrast.
    pub compact: bool,
}

impl Default for ServiceCardSettings {
    fn default() -> Self {
        ServiceCardSettings {
            seed: 0x6361_7264,
            kernel: CardKernel::default(),
            compact: false,
        }
    }
}

/// Custom cursor: an instant dot plus a trailing ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    pub trailer: FollowMode,
    /// Diameters in CSS pixels.
    pub dot_size: f32,
    pub ring_size: f32,
    /// Ring diameter over links and buttons.
    pub ring_hover_size: f32,
}

impl Default for CursorSettings {
    fn default() -> Self {
        CursorSettings {
            trailer: FollowMode::TRAILER,
            dot_size: 8.0,
            ring_size: 20.0,
            ring_hover_size: 48.0,
        }
    }
}
