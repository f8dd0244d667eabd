//! Full-screen selection overlay.
//!
//! This module contains the `SnippingOverlay` struct which implements the
//! `eframe::App` trait, and [`OverlaySurface`], the [`SelectionSurface`] that
//! runs it over the whole virtual desktop.

use super::rendering::{
    draw_full_veil, draw_selection_border, draw_selection_overlay, draw_size_label, FrameMapping,
};
use super::selection::SelectionSession;
use super::state::{CancelReason, PointerButton, SelectionEvent};
use super::{OverlayStyle, SelectionSurface};
use crate::capture::CapturedFrame;
use crate::error::{AppError, Result};
use eframe::egui;
use std::sync::{Arc, Mutex};

const OVERLAY_TITLE: &str = "ShareShot Selection";

/// The overlay application.
///
/// The session lives in a shared slot so that [`OverlaySurface::run`] can
/// take it back after the event loop returns.
struct SnippingOverlay {
    session: Arc<Mutex<Option<SelectionSession>>>,
    /// Pre-converted image data for fast texture upload
    color_image: Option<egui::ColorImage>,
    image_texture: Option<egui::TextureHandle>,
    style: OverlayStyle,
    closing: bool,
}

impl SnippingOverlay {
    fn new(
        session: Arc<Mutex<Option<SelectionSession>>>,
        color_image: egui::ColorImage,
        style: OverlayStyle,
    ) -> Self {
        Self {
            session,
            color_image: Some(color_image),
            image_texture: None,
            style,
            closing: false,
        }
    }

    fn close(&mut self, ctx: &egui::Context) {
        if !self.closing {
            self.closing = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Draws the veil, cutout, border and label for the current state.
    fn paint(&self, ui: &egui::Ui, session: &SelectionSession, mapping: &FrameMapping) {
        let painter = ui.painter();
        let screen_rect = ui.max_rect();

        match session.selection() {
            None => draw_full_veil(painter, screen_rect, self.style.veil_alpha),
            Some(selection) => {
                let selection_rect = mapping.to_screen(selection);
                draw_selection_overlay(painter, screen_rect, selection_rect, self.style.veil_alpha);
                draw_selection_border(painter, selection_rect, &self.style);
                if self.style.show_size_label {
                    draw_size_label(painter, screen_rect, selection_rect, selection);
                }
            }
        }
    }
}

/// Translates one egui input event into frame coordinates.
fn translate_event(event: &egui::Event, mapping: &FrameMapping) -> Option<SelectionEvent> {
    match event {
        egui::Event::PointerButton {
            pos,
            button,
            pressed,
            ..
        } => {
            let button = match button {
                egui::PointerButton::Primary => PointerButton::Primary,
                egui::PointerButton::Secondary => PointerButton::Secondary,
                egui::PointerButton::Middle => PointerButton::Middle,
                _ => return None,
            };
            let at = mapping.to_frame(*pos);
            Some(if *pressed {
                SelectionEvent::PointerDown { at, button }
            } else {
                SelectionEvent::PointerUp { at, button }
            })
        }
        egui::Event::PointerMoved(pos) => Some(SelectionEvent::PointerMove {
            at: mapping.to_frame(*pos),
        }),
        egui::Event::Key {
            key: egui::Key::Escape,
            pressed: true,
            ..
        } => Some(SelectionEvent::Cancel),
        _ => None,
    }
}

impl eframe::App for SnippingOverlay {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Upload texture on first frame using pre-converted data
        if self.image_texture.is_none() {
            if let Some(color_image) = self.color_image.take() {
                self.image_texture = Some(ctx.load_texture(
                    "captured_frame",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }

        let slot = Arc::clone(&self.session);
        let Ok(mut guard) = slot.lock() else {
            log::error!("Selection session lock poisoned, closing overlay");
            self.close(ctx);
            return;
        };
        let Some(session) = guard.as_mut() else {
            self.close(ctx);
            return;
        };

        // Fullscreen panel with no margins
        let panel_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(0))
            .outer_margin(egui::Margin::same(0));

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                let screen_rect = ui.max_rect();
                let mapping =
                    FrameMapping::new(screen_rect, session.frame().width(), session.frame().height());

                // Events are applied in delivery order, one at a time.
                let (events, close_requested) =
                    ctx.input(|i| (i.events.clone(), i.viewport().close_requested()));
                let mut redraw = false;
                for event in &events {
                    if let Some(event) = translate_event(event, &mapping) {
                        redraw |= session.handle(event);
                    }
                }
                if close_requested {
                    session.cancel(CancelReason::OverlayClosed);
                }

                if let Some(texture) = &self.image_texture {
                    ui.painter().image(
                        texture.id(),
                        screen_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                if session.is_resolved() {
                    return;
                }

                self.paint(ui, session, &mapping);
                ctx.set_cursor_icon(egui::CursorIcon::Crosshair);

                if redraw {
                    ctx.request_repaint();
                }
            });

        if session.is_resolved() {
            log::debug!("Selection resolved: {:?}", session.state());
            drop(guard);
            self.close(ctx);
        }
    }
}

/// Converts a frame into egui's texture format.
fn to_color_image(frame: &CapturedFrame) -> egui::ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, frame.pixels().as_raw())
}

/// [`SelectionSurface`] that shows a borderless always-on-top window
/// covering the virtual desktop.
#[derive(Clone, Debug, Default)]
pub struct OverlaySurface {
    style: OverlayStyle,
}

impl OverlaySurface {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }
}

impl SelectionSurface for OverlaySurface {
    fn run(&mut self, session: SelectionSession) -> Result<SelectionSession> {
        let bounds = session.frame().bounds();

        // Pre-convert before the UI loop starts; this is the expensive part.
        let color_image = to_color_image(session.frame());

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(OVERLAY_TITLE)
                .with_position(egui::pos2(bounds.x as f32, bounds.y as f32))
                .with_inner_size(egui::vec2(bounds.width as f32, bounds.height as f32))
                .with_decorations(false)
                .with_resizable(false)
                .with_always_on_top(),
            ..Default::default()
        };

        let slot = Arc::new(Mutex::new(Some(session)));
        let app_slot = Arc::clone(&slot);
        let style = self.style.clone();

        eframe::run_native(
            OVERLAY_TITLE,
            options,
            Box::new(move |_cc| {
                Ok(Box::new(SnippingOverlay::new(app_slot, color_image, style))
                    as Box<dyn eframe::App>)
            }),
        )
        .map_err(|e| AppError::ui(format!("Failed to run overlay: {}", e)))?;

        let mut lock = slot
            .lock()
            .map_err(|_| AppError::ui("Failed to acquire session lock"))?;
        lock.take()
            .ok_or_else(|| AppError::ui("Overlay did not hand back the selection session"))
    }
}
