// Immediate-mode drawing surface.
// Renderers emit DrawCommands; the host replays them onto a 2D canvas context.
// One serialized list per frame keeps JS↔WASM crossings to one.

use serde::{Deserialize, Serialize};

use crate::types::{BackingSize, Rgba, Viewport};

/// Color stop of a gradient; `offset` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub fn new(offset: f32, color: Rgba) -> Self {
        GradientStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        }
    }
}

/// Fill style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Paint {
    Solid {
        color: Rgba,
    },
    Linear {
        from: [f32; 2],
        to: [f32; 2],
        stops: Vec<GradientStop>,
    },
    Radial {
        center: [f32; 2],
        inner: f32,
        outer: f32,
        stops: Vec<GradientStop>,
    },
}

impl From<Rgba> for Paint {
    fn from(color: Rgba) -> Self {
        Paint::Solid { color }
    }
}

/// One drawing operation, in logical (CSS pixel) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Reallocate the backing store and set the context scale.
    Resize { backing: BackingSize },
    /// Drop the backing store; nothing follows.
    Release,
    Clear,
    /// Fill the whole surface; a translucent color leaves trails.
    Wash { paint: Paint },
    Rect { x: f32, y: f32, w: f32, h: f32, paint: Paint },
    Circle { x: f32, y: f32, r: f32, paint: Paint },
    Ellipse {
        x: f32,
        y: f32,
        rx: f32,
        ry: f32,
        rotation: f32,
        paint: Paint,
    },
    StrokeEllipse {
        x: f32,
        y: f32,
        rx: f32,
        ry: f32,
        rotation: f32,
        width: f32,
        color: Rgba,
    },
    Line {
        from: [f32; 2],
        to: [f32; 2],
        width: f32,
        color: Rgba,
    },
    Polyline {
        points: Vec<[f32; 2]>,
        width: f32,
        color: Rgba,
    },
    Glyph { ch: char, x: f32, y: f32, size: f32, color: Rgba },
    /// Canvas `setTransform(a, b, c, d, e, f)`, pre-multiplied by the backing scale on the host.
    SetTransform { matrix: [f32; 6] },
    ResetTransform,
    /// `blur` of zero disables the shadow.
    Shadow { blur: f32, color: Rgba },
}

/// Drawing target for renderers.
pub trait Surface {
    /// Logical size in CSS pixels.
    fn size(&self) -> (f32, f32);

    fn submit(&mut self, command: DrawCommand);

    fn resize(&mut self, viewport: &Viewport, backing: BackingSize);

    /// Free the backing store. Further submissions are dropped.
    fn release(&mut self);

    /// Current backing store, `None` before the first resize or after release.
    fn backing(&self) -> Option<BackingSize>;

    fn clear(&mut self) {
        self.submit(DrawCommand::Clear);
    }

    fn wash(&mut self, paint: Paint) {
        self.submit(DrawCommand::Wash { paint });
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: Paint) {
        self.submit(DrawCommand::Rect { x, y, w, h, paint });
    }

    fn fill_circle(&mut self, x: f32, y: f32, r: f32, paint: Paint) {
        if r > 0.0 && r.is_finite() {
            self.submit(DrawCommand::Circle { x, y, r, paint });
        }
    }

    fn fill_ellipse(&mut self, x: f32, y: f32, rx: f32, ry: f32, rotation: f32, paint: Paint) {
        if rx > 0.0 && ry > 0.0 {
            self.submit(DrawCommand::Ellipse {
                x,
                y,
                rx,
                ry,
                rotation,
                paint,
            });
        }
    }

    fn line(&mut self, from: [f32; 2], to: [f32; 2], width: f32, color: Rgba) {
        if width > 0.0 && color.a > 0.0 {
            self.submit(DrawCommand::Line {
                from,
                to,
                width,
                color,
            });
        }
    }

    fn shadow(&mut self, blur: f32, color: Rgba) {
        self.submit(DrawCommand::Shadow { blur, color });
    }
}

/// Recording surface. Commands accumulate until the host takes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    logical: (f32, f32),
    backing: Option<BackingSize>,
    commands: Vec<DrawCommand>,
    released: bool,
}

impl DisplayList {
    pub fn new() -> Self {
        DisplayList::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hand the recorded commands to the host, leaving the list empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f32, f32) {
        self.logical
    }

    fn submit(&mut self, command: DrawCommand) {
        if !self.released {
            self.commands.push(command);
        }
    }

    fn resize(&mut self, viewport: &Viewport, backing: BackingSize) {
        if self.released {
            return;
        }
        self.logical = (viewport.width, viewport.height);
        self.backing = Some(backing);
        self.commands.push(DrawCommand::Resize { backing });
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.backing = None;
        self.commands.push(DrawCommand::Release);
        self.released = true;
    }

    fn backing(&self) -> Option<BackingSize> {
        self.backing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_commands_in_order() {
        let mut list = DisplayList::new();
        list.resize(
            &Viewport::new(10.0, 10.0, 1.0),
            BackingSize {
                width: 10,
                height: 10,
                scale: 1.0,
            },
        );
        list.clear();
        list.fill_circle(1.0, 1.0, 2.0, Rgba::WHITE.into());
        let cmds = list.take_commands();
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[0], DrawCommand::Resize { .. }));
        assert!(matches!(cmds[2], DrawCommand::Circle { .. }));
        assert!(list.commands().is_empty());
    }

    #[test]
    fn release_drops_backing_and_later_draws() {
        let mut list = DisplayList::new();
        list.resize(
            &Viewport::new(10.0, 10.0, 1.0),
            BackingSize {
                width: 10,
                height: 10,
                scale: 1.0,
            },
        );
        list.release();
        list.clear();
        assert!(list.backing().is_none());
        assert_eq!(list.commands().last(), Some(&DrawCommand::Release));
    }

    #[test]
    fn degenerate_shapes_are_skipped() {
        let mut list = DisplayList::new();
        list.fill_circle(0.0, 0.0, 0.0, Rgba::WHITE.into());
        list.fill_circle(0.0, 0.0, f32::NAN, Rgba::WHITE.into());
        list.line([0.0, 0.0], [1.0, 1.0], 1.0, Rgba::WHITE.with_alpha(0.0));
        assert!(list.commands().is_empty());
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let json = serde_json::to_string(&DrawCommand::Clear).unwrap();
        assert_eq!(json, r#"{"op":"clear"}"#);
    }
}
