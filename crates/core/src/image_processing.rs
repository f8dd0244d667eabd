//! Image processing and encoding utilities.
//!
//! This module crops the committed selection out of a [`CapturedFrame`] and
//! encodes the JPEG handed to the share sink.
//!
//! # Crop policy
//!
//! The committed rectangle is cropped exactly as selected, with no inset for
//! the selection border. The border is only ever drawn on the overlay, never
//! into the frame, so there is nothing to exclude.

use crate::capture::CapturedFrame;
use crate::error::{AppError, Result, SinkError};
use crate::geometry::Rect;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Image processing utilities for the capture cycle.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Crops `selection` (frame pixel coordinates) out of `frame`.
    ///
    /// The selection is clipped to the frame first; the output dimensions
    /// equal the selection's whenever it lies within the frame, which the
    /// overlay guarantees.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidSelection`] if nothing of the selection
    /// overlaps the frame.
    pub fn crop(frame: &CapturedFrame, selection: Rect) -> Result<RgbaImage> {
        let area = frame
            .local_rect()
            .intersect(selection)
            .ok_or(AppError::InvalidSelection)?;

        // intersect() only yields rects inside the frame, so x/y are >= 0.
        let cropped = image::imageops::crop_imm(
            frame.pixels(),
            area.x as u32,
            area.y as u32,
            area.width,
            area.height,
        )
        .to_image();

        Ok(cropped)
    }

    /// Encodes an image to a Base64 JPEG string.
    ///
    /// JPEG has no alpha channel, so the image is flattened to RGB first.
    pub fn encode_to_base64_jpeg(image: &RgbaImage) -> std::result::Result<String, SinkError> {
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut buffer: Vec<u8> = Vec::new();

        rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .map_err(|e| SinkError::Encode(format!("Failed to encode JPEG: {}", e)))?;

        Ok(BASE64.encode(buffer))
    }
}
