//! egui widget that paints a recorded display list
//!
//! Coordinates in the display list are relative to the surface origin;
//! the widget translates them into the space it allocates in the layout.

use eframe::egui::{self, Align2, FontFamily, FontId};

use super::surface::{DisplayList, DrawCommand};

/// Text is positioned by its baseline, so anchor at the bottom
const TEXT_ANCHOR: Align2 = Align2::CENTER_BOTTOM;

/// Paints a [`DisplayList`] into the UI
pub struct MeterView;

impl MeterView {
    /// Allocate the list's size and replay its commands
    ///
    /// # Returns
    /// The response from the widget
    pub fn show(ui: &mut egui::Ui, list: &DisplayList) -> egui::Response {
        let (response, painter) = ui.allocate_painter(list.size(), egui::Sense::hover());
        let rect = response.rect;
        let origin = rect.min.to_vec2();
        let painter = painter.with_clip_rect(rect);

        for command in list.commands() {
            match command {
                DrawCommand::Rect { rect, color } => {
                    painter.rect_filled(rect.translate(origin), 0.0, *color);
                }
                DrawCommand::Text { text, pos, style } => {
                    // The default egui fonts ship without a bold face
                    let font = FontId::new(style.size, FontFamily::Proportional);
                    painter.text(*pos + origin, TEXT_ANCHOR, text, font, style.color);
                }
            }
        }

        response
    }
}
