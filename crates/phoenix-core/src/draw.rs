//! Draw boundary
//!
//! The engine never touches pixels. Effects emit primitive calls into a
//! `DrawSink` supplied by the host's canvas adapter.

use serde::{Deserialize, Serialize};

/// Packed 0xAARRGGBB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    /// Opaque black
    pub const BLACK: Argb = Argb(0xFF00_0000);
    /// Opaque white
    pub const WHITE: Argb = Argb(0xFFFF_FFFF);
    /// Fully transparent
    pub const TRANSPARENT: Argb = Argb(0x0000_0000);

    /// Opaque color from 8-bit channels
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Argb(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Color from a 0x00RRGGBB value as stored in legacy presets
    pub const fn from_legacy(rgb: u32) -> Self {
        Argb(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }

    /// Alpha channel
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red, green and blue channels
    pub const fn rgb(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Argb((self.0 & 0x00FF_FFFF) | (alpha as u32) << 24)
    }

    /// Scale the color channels by `factor`, keeping alpha
    pub fn scale(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let (r, g, b) = self.rgb();
        let s = |c: u8| (c as f32 * factor).round() as u8;
        Argb::from_rgb(s(r), s(g), s(b)).with_alpha(self.alpha())
    }
}

/// Canvas coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl Point {
    /// Create a point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Primitive drawing surface
pub trait DrawSink {
    /// Fill the whole canvas
    fn clear(&mut self, color: Argb);
    /// Straight line segment
    fn line(&mut self, from: Point, to: Point, color: Argb, thickness: f32);
    /// Axis-aligned rectangle
    fn rect(&mut self, origin: Point, width: f32, height: f32, color: Argb, filled: bool);
    /// Circle
    fn circle(&mut self, center: Point, radius: f32, color: Argb, filled: bool);
    /// Text anchored at its top-left corner
    fn text(&mut self, position: Point, text: &str, color: Argb, size: f32);
    /// Filled polygon
    fn polygon(&mut self, points: &[Point], color: Argb);
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// See [`DrawSink::clear`]
    Clear(Argb),
    /// See [`DrawSink::line`]
    Line {
        /// Start point
        from: Point,
        /// End point
        to: Point,
        /// Stroke color
        color: Argb,
        /// Stroke width in pixels
        thickness: f32,
    },
    /// See [`DrawSink::rect`]
    Rect {
        /// Top-left corner
        origin: Point,
        /// Width in pixels
        width: f32,
        /// Height in pixels
        height: f32,
        /// Color
        color: Argb,
        /// Fill instead of outline
        filled: bool,
    },
    /// See [`DrawSink::circle`]
    Circle {
        /// Center point
        center: Point,
        /// Radius in pixels
        radius: f32,
        /// Color
        color: Argb,
        /// Fill instead of outline
        filled: bool,
    },
    /// See [`DrawSink::text`]
    Text {
        /// Top-left anchor
        position: Point,
        /// Content
        text: String,
        /// Color
        color: Argb,
        /// Font size in pixels
        size: f32,
    },
    /// See [`DrawSink::polygon`]
    Polygon {
        /// Vertices in order
        points: Vec<Point>,
        /// Fill color
        color: Argb,
    },
}

impl DrawCommand {
    /// Short kind name, used for statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Clear(_) => "clear",
            Self::Line { .. } => "line",
            Self::Rect { .. } => "rect",
            Self::Circle { .. } => "circle",
            Self::Text { .. } => "text",
            Self::Polygon { .. } => "polygon",
        }
    }

    /// Issue this command against a sink
    pub fn apply(&self, sink: &mut dyn DrawSink) {
        match self {
            Self::Clear(color) => sink.clear(*color),
            Self::Line {
                from,
                to,
                color,
                thickness,
            } => sink.line(*from, *to, *color, *thickness),
            Self::Rect {
                origin,
                width,
                height,
                color,
                filled,
            } => sink.rect(*origin, *width, *height, *color, *filled),
            Self::Circle {
                center,
                radius,
                color,
                filled,
            } => sink.circle(*center, *radius, *color, *filled),
            Self::Text {
                position,
                text,
                color,
                size,
            } => sink.text(*position, text, *color, *size),
            Self::Polygon { points, color } => sink.polygon(points, *color),
        }
    }
}

/// Sink that records every call in order
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recorder empty
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Nothing recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Replay the recorded commands into another sink
    pub fn replay(&self, sink: &mut dyn DrawSink) {
        for command in &self.commands {
            command.apply(sink);
        }
    }
}

impl DrawSink for CommandRecorder {
    fn clear(&mut self, color: Argb) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn line(&mut self, from: Point, to: Point, color: Argb, thickness: f32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            thickness,
        });
    }

    fn rect(&mut self, origin: Point, width: f32, height: f32, color: Argb, filled: bool) {
        self.commands.push(DrawCommand::Rect {
            origin,
            width,
            height,
            color,
            filled,
        });
    }

    fn circle(&mut self, center: Point, radius: f32, color: Argb, filled: bool) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            filled,
        });
    }

    fn text(&mut self, position: Point, text: &str, color: Argb, size: f32) {
        self.commands.push(DrawCommand::Text {
            position,
            text: text.to_string(),
            color,
            size,
        });
    }

    fn polygon(&mut self, points: &[Point], color: Argb) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_channels() {
        let c = Argb::from_rgb(0x12, 0x34, 0x56);
        assert_eq!(c.0, 0xFF12_3456);
        assert_eq!(c.rgb(), (0x12, 0x34, 0x56));
        assert_eq!(c.with_alpha(0x80).alpha(), 0x80);
        assert_eq!(Argb::from_legacy(0xAB00_FF00), Argb(0xFF00_FF00));
        assert_eq!(Argb::WHITE.scale(0.5).rgb(), (128, 128, 128));
    }

    #[test]
    fn test_recorder_replay() {
        let mut recorder = CommandRecorder::new();
        recorder.clear(Argb::BLACK);
        recorder.line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Argb::WHITE, 1.0);
        recorder.polygon(&[Point::new(0.0, 0.0); 3], Argb::WHITE);

        let mut copy = CommandRecorder::new();
        recorder.replay(&mut copy);
        assert_eq!(copy.commands(), recorder.commands());

        let taken = recorder.take();
        assert_eq!(taken.len(), 3);
        assert!(recorder.is_empty());
        assert_eq!(taken[1].kind(), "line");
    }
}
