// SPDX-License-Identifier: GPL-3.0-only

//! Luminance images cut out of preview frames

use crate::backends::camera::{CameraFrame, PixelFormat};
use crate::errors::CaptureError;
use crate::framing::Rect;
use image::GrayImage;
use image::imageops::FilterType;

/// An 8-bit luminance image, one byte per pixel, no padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceImage {
    pixels: GrayImage,
}

impl LuminanceImage {
    pub fn new(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    /// Wrap a packed buffer; `None` if the length does not match
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width, height, data).map(Self::new)
    }

    /// Cut `rect` (preview-buffer coordinates) out of a frame
    ///
    /// NV21 and Gray8 frames are read straight from the luminance plane.
    /// RGBA frames are converted with integer BT.601 weights.
    pub fn crop_from_frame(frame: &CameraFrame, rect: Rect) -> Result<Self, CaptureError> {
        let out_of_bounds = || CaptureError::CropOutOfBounds {
            frame_width: frame.width,
            frame_height: frame.height,
        };

        if !rect.fits_within(frame.width, frame.height) {
            return Err(out_of_bounds());
        }

        let bpp = frame.format.luma_bytes_per_pixel() as usize;
        let stride = frame.stride as usize;
        let left = rect.left as usize;
        let top = rect.top as usize;
        let width = rect.width() as usize;
        let height = rect.height() as usize;

        if stride < frame.width as usize * bpp {
            return Err(out_of_bounds());
        }
        let last_row_end = (top + height - 1) * stride + (left + width) * bpp;
        if last_row_end > frame.data.len() {
            return Err(out_of_bounds());
        }

        let mut data = Vec::with_capacity(width * height);
        for y in top..top + height {
            let row_start = y * stride + left * bpp;
            let row = &frame.data[row_start..row_start + width * bpp];
            match frame.format {
                PixelFormat::Nv21 | PixelFormat::Gray8 => data.extend_from_slice(row),
                PixelFormat::Rgba => data.extend(row.chunks_exact(4).map(|px| {
                    let (r, g, b) = (u32::from(px[0]), u32::from(px[1]), u32::from(px[2]));
                    ((77 * r + 150 * g + 29 * b + 128) >> 8) as u8
                })),
            }
        }

        Self::from_raw(width as u32, height as u32, data).ok_or_else(out_of_bounds)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Luminance at (x, y); panics outside the image like `GrayImage`
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.pixels.get_pixel(x, y).0[0]
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }

    /// Flip dark and light, for light-on-dark codes
    pub fn invert(&mut self) {
        image::imageops::invert(&mut self.pixels);
    }

    /// Copy shrunk by `scale` on each axis (never below 1x1)
    pub fn thumbnail(&self, scale: u32) -> Self {
        let scale = scale.max(1);
        let width = (self.width() / scale).max(1);
        let height = (self.height() / scale).max(1);
        if scale == 1 {
            return self.clone();
        }
        Self::new(image::imageops::resize(
            &self.pixels,
            width,
            height,
            FilterType::Triangle,
        ))
    }
}
