// Engine catalogue and the mount factory used by the JS boundary.

pub mod aurora;
pub mod butterfly;
pub mod cards;
pub mod cloud;
pub mod cursor;
pub mod floating_world;
pub mod preloader;
pub mod starfield;
pub mod swarm;

pub use aurora::Aurora;
pub use butterfly::Butterflies;
pub use cards::ServiceCard;
pub use cloud::Clouds;
pub use cursor::CursorTrailer;
pub use floating_world::FloatingWorld;
pub use preloader::Preloader;
pub use starfield::Starfield;
pub use swarm::Fireflies;

use crate::config::FrameEnvelope;
use crate::controller::{ActiveEngine, Mounted, Simulation};
use crate::error::EngineError;
use crate::host::FrameHost;
use crate::surface::DisplayList;
use crate::types::{EngineKind, Viewport};

fn activate<S: Simulation + 'static>(
    config_json: &str,
    viewport: Viewport,
    surface: Option<DisplayList>,
    host: &mut dyn FrameHost,
) -> Result<Box<dyn Mounted>, EngineError> {
    let envelope: FrameEnvelope = serde_json::from_str(config_json)?;
    let config: S::Config = serde_json::from_str(config_json)?;
    let engine = ActiveEngine::<S>::activate(&config, envelope.frame, viewport, surface, host)
        .ok_or(EngineError::SurfaceUnavailable(S::KIND))?;
    Ok(Box::new(engine))
}

/// Parse `config_json` for `kind` and activate it. An empty string means
/// all defaults. The optional `frame` block overrides the frame settings.
pub fn mount(
    kind: EngineKind,
    config_json: &str,
    viewport: Viewport,
    surface: Option<DisplayList>,
    host: &mut dyn FrameHost,
) -> Result<Box<dyn Mounted>, EngineError> {
    let json = if config_json.trim().is_empty() { "{}" } else { config_json };
    match kind {
        EngineKind::Aurora => activate::<Aurora>(json, viewport, surface, host),
        EngineKind::Clouds => activate::<Clouds>(json, viewport, surface, host),
        EngineKind::Fireflies => activate::<Fireflies>(json, viewport, surface, host),
        EngineKind::Butterflies => activate::<Butterflies>(json, viewport, surface, host),
        EngineKind::FloatingWorld => activate::<FloatingWorld>(json, viewport, surface, host),
        EngineKind::Preloader => activate::<Preloader>(json, viewport, surface, host),
        EngineKind::Starfield => activate::<Starfield>(json, viewport, surface, host),
        EngineKind::ServiceCard => activate::<ServiceCard>(json, viewport, surface, host),
        EngineKind::CursorTrailer => activate::<CursorTrailer>(json, viewport, surface, host),
    }
}

/// Same as `mount`, with the kind given by name.
pub fn mount_named(
    name: &str,
    config_json: &str,
    viewport: Viewport,
    surface: Option<DisplayList>,
    host: &mut dyn FrameHost,
) -> Result<Box<dyn Mounted>, EngineError> {
    let kind = EngineKind::parse(name).ok_or_else(|| EngineError::UnknownEngine(name.to_string()))?;
    mount(kind, config_json, viewport, surface, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FrameQueue;
    use crate::types::{SignalBundle, Timestamp};

    const ALL: [EngineKind; 9] = [
        EngineKind::Aurora,
        EngineKind::Clouds,
        EngineKind::Fireflies,
        EngineKind::Butterflies,
        EngineKind::FloatingWorld,
        EngineKind::Preloader,
        EngineKind::Starfield,
        EngineKind::ServiceCard,
        EngineKind::CursorTrailer,
    ];

    #[test]
    fn every_engine_mounts_ticks_and_unmounts_cleanly() {
        let mut queue = FrameQueue::new();
        for kind in ALL {
            let mut engine = mount(kind, "", Viewport::default(), Some(DisplayList::new()), &mut queue).unwrap();
            assert_eq!(engine.kind(), kind);
            for i in 1..=30u64 {
                engine.tick(&mut queue, Timestamp::from_micros(i * 16_667), &SignalBundle::default());
            }
            engine.drain();
            let last = engine.deactivate(&mut queue);
            assert!(last.commands.iter().all(|c| matches!(c, crate::surface::DrawCommand::Release)));
            assert_eq!(queue.pending_count(), 0, "{kind:?} left a frame request");
            assert_eq!(queue.listener_count(), 0, "{kind:?} left a resize listener");
        }
    }

    #[test]
    fn canvas_engines_need_a_surface() {
        let mut queue = FrameQueue::new();
        let err = mount(EngineKind::Aurora, "{}", Viewport::default(), None, &mut queue).err();
        assert!(matches!(err, Some(EngineError::SurfaceUnavailable(EngineKind::Aurora))));
        let clouds = mount(EngineKind::Clouds, "{}", Viewport::default(), None, &mut queue).unwrap();
        clouds.deactivate(&mut queue);
        assert_eq!(queue.listener_count(), 0);
    }

    #[test]
    fn bad_input_is_rejected() {
        let mut queue = FrameQueue::new();
        let unknown = mount_named("lava_lamp", "{}", Viewport::default(), None, &mut queue).err();
        assert!(matches!(unknown, Some(EngineError::UnknownEngine(_))));
        let malformed = mount_named("starfield", "{count:", Viewport::default(), Some(DisplayList::new()), &mut queue).err();
        assert!(matches!(malformed, Some(EngineError::InvalidConfig(_))));
        assert_eq!(queue.listener_count(), 0);
    }

    #[test]
    fn frame_block_is_read_alongside_engine_fields() {
        let mut queue = FrameQueue::new();
        let json = r#"{"count": 10, "frame": {"max_device_pixel_ratio": 1.0}}"#;
        let engine = mount(EngineKind::Starfield, json, Viewport::new(100.0, 100.0, 3.0), Some(DisplayList::new()), &mut queue).unwrap();
        assert_eq!(engine.backing().width, 100);
        engine.deactivate(&mut queue);
    }
}
