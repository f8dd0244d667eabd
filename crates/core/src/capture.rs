//! Multi-monitor screen capture.
//!
//! The [`DisplayCompositor`] enumerates every connected display, computes the
//! union of their bounds (the virtual desktop) and blits each display into one
//! [`CapturedFrame`] at its offset from the virtual desktop origin.
//!
//! Displays are read one after another, so fast on-screen motion can tear
//! across monitor boundaries. Any failed read discards the whole frame.
//!
//! # Example
//!
//! ```ignore
//! use shareshot_core::capture::{DisplayCompositor, ScreenSource};
//!
//! let compositor = DisplayCompositor::new(ScreenSource);
//! let bounds = compositor.compute_virtual_bounds()?;
//! let frame = compositor.capture_all(bounds)?;
//! ```

use crate::error::CaptureError;
use crate::geometry::Rect;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use screenshots::Screen;

/// Description of one physical display in virtual desktop coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayInfo {
    pub id: u32,
    pub name: String,
    pub bounds: Rect,
    pub scale_factor: f32,
    pub is_primary: bool,
}

/// Platform seam for display enumeration and pixel reads.
///
/// `Handle` is whatever the platform needs to read a display back; it is only
/// valid for the enumeration that produced it.
pub trait DisplaySource {
    type Handle;

    /// Lists the currently connected displays.
    fn enumerate(&self) -> Result<Vec<(DisplayInfo, Self::Handle)>, CaptureError>;

    /// Reads the current pixels of one display.
    fn capture(&self, info: &DisplayInfo, handle: &Self::Handle)
    -> Result<RgbaImage, CaptureError>;
}

/// [`DisplaySource`] backed by the `screenshots` crate.
///
/// Works on X11, Windows and macOS.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScreenSource;

impl DisplaySource for ScreenSource {
    type Handle = Screen;

    fn enumerate(&self) -> Result<Vec<(DisplayInfo, Screen)>, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Enumerate(e.to_string()))?;

        Ok(screens
            .into_iter()
            .map(|screen| {
                let d = &screen.display_info;
                let info = DisplayInfo {
                    id: d.id,
                    name: format!("Display {}", d.id),
                    bounds: Rect::new(d.x, d.y, d.width, d.height),
                    scale_factor: d.scale_factor,
                    is_primary: d.is_primary,
                };
                (info, screen)
            })
            .collect())
    }

    fn capture(&self, info: &DisplayInfo, screen: &Screen) -> Result<RgbaImage, CaptureError> {
        let captured = screen
            .capture()
            .map_err(|e| CaptureError::display(&info.name, e))?;

        // Convert screenshots::Image to image::RgbaImage
        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();

        RgbaImage::from_raw(width, height, rgba_data)
            .ok_or_else(|| CaptureError::display(&info.name, "pixel buffer size mismatch"))
    }
}

/// A composited snapshot of every display.
///
/// `bounds` is the virtual desktop in logical coordinates. The pixel buffer is
/// `bounds` multiplied by `scale`, so HiDPI displays keep their native pixels.
/// Pixel `(0, 0)` corresponds to the virtual desktop origin `bounds.x, bounds.y`.
#[derive(Debug)]
pub struct CapturedFrame {
    bounds: Rect,
    scale: f32,
    pixels: RgbaImage,
}

impl CapturedFrame {
    /// Wraps an already composited buffer at one pixel per logical unit.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Buffer`] if the buffer size does not match `bounds`.
    pub fn new(bounds: Rect, pixels: RgbaImage) -> Result<Self, CaptureError> {
        Self::scaled(bounds, pixels, 1.0)
    }

    /// Wraps a buffer holding `scale` pixels per logical unit.
    pub fn scaled(bounds: Rect, pixels: RgbaImage, scale: f32) -> Result<Self, CaptureError> {
        let expected = (scale_len(bounds.width, scale), scale_len(bounds.height, scale));
        if scale.is_nan() || scale < 1.0 || pixels.dimensions() != expected {
            return Err(CaptureError::buffer(format!(
                "buffer is {}x{} but bounds are {} at scale {}",
                pixels.width(),
                pixels.height(),
                bounds,
                scale
            )));
        }
        Ok(Self {
            bounds,
            scale,
            pixels,
        })
    }

    /// The virtual desktop bounds this frame covers, in logical units.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Pixels per logical unit.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// The frame in its own pixel space: origin `(0, 0)`, buffer size.
    pub fn local_rect(&self) -> Rect {
        Rect::new(0, 0, self.pixels.width(), self.pixels.height())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

fn scale_len(len: u32, scale: f32) -> u32 {
    (len as f32 * scale).round() as u32
}

fn scale_offset(offset: i64, scale: f32) -> i64 {
    (offset as f32 * scale).round() as i64
}

/// Builds [`CapturedFrame`]s spanning every connected display.
pub struct DisplayCompositor<S> {
    source: S,
}

impl<S: DisplaySource> DisplayCompositor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Lists displays as human-readable descriptions.
    pub fn list_displays(&self) -> Result<Vec<String>, CaptureError> {
        Ok(self
            .source
            .enumerate()?
            .iter()
            .enumerate()
            .map(|(i, (d, _))| {
                format!(
                    "Monitor {}: {}x{} at ({}, {}) (scale: {}){}",
                    i,
                    d.bounds.width,
                    d.bounds.height,
                    d.bounds.x,
                    d.bounds.y,
                    d.scale_factor,
                    if d.is_primary { " [primary]" } else { "" }
                )
            })
            .collect())
    }

    /// Union of all connected display bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDisplays`] if nothing is connected.
    pub fn compute_virtual_bounds(&self) -> Result<Rect, CaptureError> {
        let displays = self.source.enumerate()?;
        virtual_bounds(displays.iter().map(|(info, _)| info))
    }

    /// Reads every display and blits it into one frame covering `bounds`.
    ///
    /// The frame uses the highest pixel density found among the displays, so
    /// the densest display is copied 1:1 and only lower-density displays are
    /// upscaled to match.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if any display read fails. No partial frame
    /// is returned in that case.
    pub fn capture_all(&self, bounds: Rect) -> Result<CapturedFrame, CaptureError> {
        if bounds.is_empty() {
            return Err(CaptureError::buffer(format!("empty virtual desktop {bounds}")));
        }

        let displays = self.source.enumerate()?;
        if displays.is_empty() {
            return Err(CaptureError::NoDisplays);
        }

        let mut shots = Vec::with_capacity(displays.len());
        for (info, handle) in &displays {
            let shot = self.source.capture(info, handle)?;
            log::debug!(
                "Captured {} ({}x{} px) for bounds {}",
                info.name,
                shot.width(),
                shot.height(),
                info.bounds
            );
            shots.push((info, shot));
        }

        let scale = shots
            .iter()
            .filter(|(info, _)| !info.bounds.is_empty())
            .map(|(info, shot)| shot.width() as f32 / info.bounds.width as f32)
            .fold(1.0_f32, f32::max);
        log::debug!("Compositing at {} px per logical unit", scale);

        let mut canvas =
            RgbaImage::new(scale_len(bounds.width, scale), scale_len(bounds.height, scale));

        for (info, mut shot) in shots {
            let target = (
                scale_len(info.bounds.width, scale),
                scale_len(info.bounds.height, scale),
            );
            if shot.dimensions() != target && target.0 > 0 && target.1 > 0 {
                shot = imageops::resize(&shot, target.0, target.1, FilterType::Triangle);
            }

            let dx = scale_offset(i64::from(info.bounds.x) - i64::from(bounds.x), scale);
            let dy = scale_offset(i64::from(info.bounds.y) - i64::from(bounds.y), scale);
            imageops::replace(&mut canvas, &shot, dx, dy);
        }

        CapturedFrame::scaled(bounds, canvas, scale)
    }

    /// Computes the current bounds and captures them in one step.
    pub fn capture(&self) -> Result<CapturedFrame, CaptureError> {
        let bounds = self.compute_virtual_bounds()?;
        log::debug!("Virtual desktop bounds: {}", bounds);
        self.capture_all(bounds)
    }
}

/// Union of the given display bounds.
pub fn virtual_bounds<'a>(
    displays: impl IntoIterator<Item = &'a DisplayInfo>,
) -> Result<Rect, CaptureError> {
    displays
        .into_iter()
        .map(|d| d.bounds)
        .reduce(|acc, r| acc.union(r))
        .ok_or(CaptureError::NoDisplays)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;
    use std::cell::Cell;

    /// Scripted display source: each display is filled with one colour.
    pub(crate) struct FakeSource {
        pub displays: Vec<(DisplayInfo, Rgba<u8>)>,
        pub fail_on: Option<u32>,
        /// `(display id, factor)`: that display returns `factor` pixels per unit.
        pub dense: Option<(u32, u32)>,
        pub reads: Cell<usize>,
    }

    impl FakeSource {
        pub fn new(bounds: &[Rect]) -> Self {
            let colours = [
                Rgba([255, 0, 0, 255]),
                Rgba([0, 255, 0, 255]),
                Rgba([0, 0, 255, 255]),
            ];
            Self {
                displays: bounds
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        let info = DisplayInfo {
                            id: i as u32,
                            name: format!("Display {i}"),
                            bounds: *b,
                            scale_factor: 1.0,
                            is_primary: i == 0,
                        };
                        (info, colours[i % colours.len()])
                    })
                    .collect(),
                fail_on: None,
                dense: None,
                reads: Cell::new(0),
            }
        }
    }

    impl DisplaySource for FakeSource {
        type Handle = Rgba<u8>;

        fn enumerate(&self) -> Result<Vec<(DisplayInfo, Rgba<u8>)>, CaptureError> {
            Ok(self.displays.clone())
        }

        fn capture(&self, info: &DisplayInfo, colour: &Rgba<u8>) -> Result<RgbaImage, CaptureError> {
            self.reads.set(self.reads.get() + 1);
            if self.fail_on == Some(info.id) {
                return Err(CaptureError::display(&info.name, "access denied"));
            }
            let factor = match self.dense {
                Some((id, factor)) if id == info.id => factor,
                _ => 1,
            };
            Ok(RgbaImage::from_pixel(
                info.bounds.width * factor,
                info.bounds.height * factor,
                *colour,
            ))
        }
    }

    #[test]
    fn side_by_side_displays_span_both() {
        let compositor = DisplayCompositor::new(FakeSource::new(&[
            Rect::new(0, 0, 1920, 1080),
            Rect::new(1920, 0, 1920, 1080),
        ]));
        assert_eq!(
            compositor.compute_virtual_bounds().unwrap(),
            Rect::new(0, 0, 3840, 1080)
        );
    }

    #[test]
    fn empty_display_list_is_no_displays() {
        let compositor = DisplayCompositor::new(FakeSource::new(&[]));
        assert!(matches!(
            compositor.compute_virtual_bounds(),
            Err(CaptureError::NoDisplays)
        ));
    }

    #[test]
    fn displays_land_at_offset_from_negative_origin() {
        let compositor = DisplayCompositor::new(FakeSource::new(&[
            Rect::new(0, 0, 40, 20),
            Rect::new(-40, 10, 40, 20),
        ]));
        let frame = compositor.capture().unwrap();

        assert_eq!(frame.bounds(), Rect::new(-40, 0, 80, 30));
        // Primary (red) starts at frame x = 40.
        assert_eq!(frame.pixels().get_pixel(40, 0), &Rgba([255, 0, 0, 255]));
        // Left display (green) occupies x 0..40, y 10..30.
        assert_eq!(frame.pixels().get_pixel(0, 10), &Rgba([0, 255, 0, 255]));
        assert_eq!(frame.pixels().get_pixel(39, 29), &Rgba([0, 255, 0, 255]));
        // Gap not covered by any display stays transparent.
        assert_eq!(frame.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn failed_read_discards_frame() {
        let mut source = FakeSource::new(&[Rect::new(0, 0, 10, 10), Rect::new(10, 0, 10, 10)]);
        source.fail_on = Some(1);
        let compositor = DisplayCompositor::new(source);

        let err = compositor.capture().unwrap_err();
        assert!(matches!(err, CaptureError::Display { .. }));
    }

    /// Source whose single display returns 1 px black/white columns at 2x.
    struct StripedRetina;

    impl DisplaySource for StripedRetina {
        type Handle = ();

        fn enumerate(&self) -> Result<Vec<(DisplayInfo, ())>, CaptureError> {
            let info = DisplayInfo {
                id: 0,
                name: "Retina".into(),
                bounds: Rect::new(0, 0, 100, 50),
                scale_factor: 2.0,
                is_primary: true,
            };
            Ok(vec![(info, ())])
        }

        fn capture(&self, _: &DisplayInfo, _: &()) -> Result<RgbaImage, CaptureError> {
            Ok(RgbaImage::from_fn(200, 100, |x, _| {
                if x % 2 == 0 {
                    Rgba([0, 0, 0, 255])
                } else {
                    Rgba([255, 255, 255, 255])
                }
            }))
        }
    }

    #[test]
    fn hidpi_capture_keeps_native_pixels() {
        let frame = DisplayCompositor::new(StripedRetina).capture().unwrap();

        assert_eq!(frame.bounds(), Rect::new(0, 0, 100, 50));
        assert_eq!(frame.scale(), 2.0);
        assert_eq!((frame.width(), frame.height()), (200, 100));
        let row: Vec<u8> = (0..6).map(|x| frame.pixels().get_pixel(x, 7)[0]).collect();
        assert_eq!(row, vec![0, 255, 0, 255, 0, 255]);
    }

    #[test]
    fn mixed_density_upscales_the_low_density_display() {
        let mut source = FakeSource::new(&[Rect::new(0, 0, 10, 10), Rect::new(10, 0, 10, 10)]);
        source.dense = Some((0, 2));

        let frame = DisplayCompositor::new(source).capture().unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 20));
        assert_eq!(frame.pixels().get_pixel(19, 19), &Rgba([255, 0, 0, 255]));
        // The 1x display is stretched over frame x 20..40.
        assert_eq!(frame.pixels().get_pixel(20, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(frame.pixels().get_pixel(39, 19), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn scaled_frame_checks_buffer_against_scale() {
        assert!(CapturedFrame::scaled(Rect::new(0, 0, 10, 5), RgbaImage::new(20, 10), 2.0).is_ok());
        assert!(CapturedFrame::scaled(Rect::new(0, 0, 10, 5), RgbaImage::new(20, 5), 2.0).is_err());
    }

    #[test]
    fn list_displays_describes_each_monitor() {
        let compositor = DisplayCompositor::new(FakeSource::new(&[
            Rect::new(0, 0, 1920, 1080),
            Rect::new(1920, 0, 1280, 1024),
        ]));
        let list = compositor.list_displays().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], "Monitor 0: 1920x1080 at (0, 0) (scale: 1) [primary]");
        assert!(list[1].starts_with("Monitor 1: 1280x1024 at (1920, 0)"));
    }

    #[test]
    fn frame_rejects_mismatched_buffer() {
        let err = CapturedFrame::new(Rect::new(0, 0, 10, 10), RgbaImage::new(5, 5)).unwrap_err();
        assert!(matches!(err, CaptureError::Buffer(_)));
    }
}
