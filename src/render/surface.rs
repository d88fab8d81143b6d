//! Drawing surface abstraction
//!
//! The meter only ever *writes* to a surface: it sets the surface size,
//! fills rectangles and fills text at explicit pixel coordinates. Nothing
//! is read back, so any backend that can do those three things can host
//! a meter.
//!
//! ## Coordinate System
//!
//! Pixels, origin at the top-left corner, Y grows downward (the same
//! convention as egui and HTML canvas).

use eframe::egui::{Color32, Pos2, Rect, Vec2};
use thiserror::Error;

/// Errors a surface may report while drawing text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Unsupported text: {0:?}")]
    UnsupportedText(String),

    #[error("Text rendering unavailable")]
    TextUnavailable,
}

/// Font and color used for a text run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels
    pub size: f32,
    pub bold: bool,
    pub color: Color32,
}

impl TextStyle {
    /// Bold 12px text, the style used for bar and axis labels
    pub fn label(color: Color32) -> Self {
        Self {
            size: 12.0,
            bold: true,
            color,
        }
    }
}

/// A write-only drawing target
pub trait Surface {
    /// Resize the surface. Resizing resets whatever was drawn before.
    fn set_size(&mut self, width: f32, height: f32);

    /// Fill a rectangle with a solid color
    fn fill_rect(&mut self, rect: Rect, color: Color32);

    /// Draw a text run centered on `pos`, with its baseline at `pos.y`
    fn fill_text(&mut self, text: &str, pos: Pos2, style: &TextStyle) -> Result<(), SurfaceError>;
}

/// A single recorded drawing primitive
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Rect { rect: Rect, color: Color32 },
    Text { text: String, pos: Pos2, style: TextStyle },
}

/// Retained surface that records drawing commands
///
/// The host replays the recorded commands each UI frame (see
/// [`super::MeterView`]). A fill that covers the whole surface hides
/// everything beneath it, so it starts a new frame and the occluded
/// commands are dropped. This keeps the list bounded to one frame.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    size: Vec2,
    commands: Vec<DrawCommand>,
    frames: u64,
    resizes: u32,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current surface size in pixels
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Commands of the current frame, in drawing order
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of frames started so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of `set_size` calls received
    pub fn resize_count(&self) -> u32 {
        self.resizes
    }

    /// Rectangles of the current frame
    pub fn rects(&self) -> impl Iterator<Item = (Rect, Color32)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Rect { rect, color } => Some((*rect, *color)),
            DrawCommand::Text { .. } => None,
        })
    }

    /// Text runs of the current frame
    pub fn texts(&self) -> impl Iterator<Item = (&str, Pos2)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, pos, .. } => Some((text.as_str(), *pos)),
            DrawCommand::Rect { .. } => None,
        })
    }

    fn covers_surface(&self, rect: Rect) -> bool {
        rect.min.x <= 0.0
            && rect.min.y <= 0.0
            && rect.max.x >= self.size.x
            && rect.max.y >= self.size.y
    }
}

impl Surface for DisplayList {
    fn set_size(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
        self.commands.clear();
        self.resizes += 1;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        if self.covers_surface(rect) {
            self.commands.clear();
            self.frames += 1;
        }
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn fill_text(&mut self, text: &str, pos: Pos2, style: &TextStyle) -> Result<(), SurfaceError> {
        if text.chars().any(char::is_control) {
            return Err(SurfaceError::UnsupportedText(text.to_string()));
        }
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            pos,
            style: *style,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    #[test]
    fn test_full_fill_starts_frame() {
        let mut list = DisplayList::new();
        list.set_size(100.0, 50.0);

        list.fill_rect(Rect::from_min_size(Pos2::ZERO, vec2(100.0, 50.0)), Color32::WHITE);
        list.fill_rect(Rect::from_min_size(pos2(10.0, 10.0), vec2(5.0, 5.0)), Color32::RED);
        assert_eq!(list.frames(), 1);
        assert_eq!(list.commands().len(), 2);

        // Second background fill drops the previous frame
        list.fill_rect(Rect::from_min_size(Pos2::ZERO, vec2(100.0, 50.0)), Color32::WHITE);
        assert_eq!(list.frames(), 2);
        assert_eq!(list.commands().len(), 1);
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut list = DisplayList::new();
        let style = TextStyle::label(Color32::BLACK);

        assert!(list.fill_text("-12", pos2(0.0, 0.0), &style).is_ok());
        assert_eq!(
            list.fill_text("bad\u{7}", pos2(0.0, 0.0), &style),
            Err(SurfaceError::UnsupportedText("bad\u{7}".to_string()))
        );
        assert_eq!(list.texts().count(), 1);
    }
}
