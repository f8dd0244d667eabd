//! Overlay drawing helpers.
//!
//! Everything here paints into one egui frame, which is tessellated and
//! presented to the back buffer in a single swap, so the veil, cutout and
//! border never appear half-drawn while the pointer moves.

use super::OverlayStyle;
use crate::geometry::{Point, Rect};
use eframe::egui;

/// Maps between frame pixels and overlay UI points.
///
/// The overlay may run at a different scale than the frame (HiDPI), so the
/// ratio is taken from the actual on-screen rectangle each frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameMapping {
    screen_rect: egui::Rect,
    scale_x: f32,
    scale_y: f32,
}

impl FrameMapping {
    pub fn new(screen_rect: egui::Rect, frame_width: u32, frame_height: u32) -> Self {
        let scale_x = frame_width as f32 / screen_rect.width().max(1.0);
        let scale_y = frame_height as f32 / screen_rect.height().max(1.0);
        Self {
            screen_rect,
            scale_x,
            scale_y,
        }
    }

    /// UI point to frame pixel.
    pub fn to_frame(&self, pos: egui::Pos2) -> Point {
        Point::new(
            ((pos.x - self.screen_rect.min.x) * self.scale_x).round() as i32,
            ((pos.y - self.screen_rect.min.y) * self.scale_y).round() as i32,
        )
    }

    /// Frame rectangle to UI rectangle.
    pub fn to_screen(&self, rect: Rect) -> egui::Rect {
        let min = egui::pos2(
            self.screen_rect.min.x + rect.x as f32 / self.scale_x,
            self.screen_rect.min.y + rect.y as f32 / self.scale_y,
        );
        let size = egui::vec2(
            rect.width as f32 / self.scale_x,
            rect.height as f32 / self.scale_y,
        );
        egui::Rect::from_min_size(min, size)
    }
}

/// Draws the veil over the whole screen.
pub fn draw_full_veil(painter: &egui::Painter, screen_rect: egui::Rect, alpha: u8) {
    painter.rect_filled(screen_rect, 0.0, egui::Color32::from_black_alpha(alpha));
}

/// Draws the veil everywhere except `selection_rect`.
///
/// Four bands around the selection leave the selected pixels unobscured.
pub fn draw_selection_overlay(
    painter: &egui::Painter,
    screen_rect: egui::Rect,
    selection_rect: egui::Rect,
    alpha: u8,
) {
    for band in veil_bands(screen_rect, selection_rect) {
        painter.rect_filled(band, 0.0, egui::Color32::from_black_alpha(alpha));
    }
}

/// The four veil rectangles around a selection: top, bottom, left, right.
pub fn veil_bands(screen_rect: egui::Rect, selection_rect: egui::Rect) -> [egui::Rect; 4] {
    [
        egui::Rect::from_min_max(
            screen_rect.min,
            egui::pos2(screen_rect.max.x, selection_rect.min.y),
        ),
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.max.y),
            screen_rect.max,
        ),
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.min.y),
            egui::pos2(selection_rect.min.x, selection_rect.max.y),
        ),
        egui::Rect::from_min_max(
            egui::pos2(selection_rect.max.x, selection_rect.min.y),
            egui::pos2(screen_rect.max.x, selection_rect.max.y),
        ),
    ]
}

/// Draws the border just outside the selection, so it never covers
/// selected pixels.
pub fn draw_selection_border(
    painter: &egui::Painter,
    selection_rect: egui::Rect,
    style: &OverlayStyle,
) {
    let [r, g, b] = style.border_color;
    painter.rect_stroke(
        selection_rect,
        0.0,
        egui::Stroke::new(style.border_width, egui::Color32::from_rgb(r, g, b)),
        egui::StrokeKind::Outside,
    );
}

/// Draws `W × H` above the selection, or inside it when there is no room.
pub fn draw_size_label(
    painter: &egui::Painter,
    screen_rect: egui::Rect,
    selection_rect: egui::Rect,
    selection: Rect,
) {
    let text = format!("{} × {}", selection.width, selection.height);
    let font = egui::FontId::monospace(13.0);
    let (anchor, align) = if selection_rect.min.y - 20.0 > screen_rect.min.y {
        (
            egui::pos2(selection_rect.min.x, selection_rect.min.y - 6.0),
            egui::Align2::LEFT_BOTTOM,
        )
    } else {
        (
            egui::pos2(selection_rect.min.x + 6.0, selection_rect.min.y + 6.0),
            egui::Align2::LEFT_TOP,
        )
    };

    let galley = painter.layout_no_wrap(text, font, egui::Color32::WHITE);
    let label_rect = align.anchor_size(anchor, galley.size());
    painter.rect_filled(
        label_rect.expand(3.0),
        3.0,
        egui::Color32::from_black_alpha(180),
    );
    painter.galley(label_rect.min, galley, egui::Color32::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_round_trips_at_double_density() {
        let screen = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(960.0, 540.0));
        let mapping = FrameMapping::new(screen, 1920, 1080);

        let p = mapping.to_frame(egui::pos2(100.0, 50.0));
        assert_eq!(p, Point::new(200, 100));

        let r = mapping.to_screen(Rect::new(200, 100, 40, 20));
        assert_eq!(r.min, egui::pos2(100.0, 50.0));
        assert_eq!(r.size(), egui::vec2(20.0, 10.0));
    }

    #[test]
    fn veil_bands_leave_selection_uncovered() {
        let screen = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(100.0, 100.0));
        let selection = egui::Rect::from_min_max(egui::pos2(20.0, 30.0), egui::pos2(60.0, 70.0));

        let bands = veil_bands(screen, selection);
        let inside = egui::pos2(40.0, 50.0);
        assert!(bands.iter().all(|b| !b.contains(inside)));

        for p in [
            egui::pos2(5.0, 5.0),
            egui::pos2(95.0, 95.0),
            egui::pos2(10.0, 50.0),
            egui::pos2(80.0, 50.0),
        ] {
            assert!(bands.iter().any(|b| b.contains(p)), "{p:?} not veiled");
        }
    }
}
