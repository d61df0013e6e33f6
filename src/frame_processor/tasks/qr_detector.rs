// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding task
//!
//! Decodes QR codes out of a cropped luminance image with the rqrr crate.
//! The other 2D symbologies are not understood here; a worker configured
//! without QR gets [`DecodeError::FormatNotEnabled`] for every frame.

use crate::config::{DecodeFormat, DecodeHints};
use crate::errors::DecodeError;
use crate::frame_processor::{DecodedSymbol, Decoder, LuminanceImage, ResultPoint};
use tracing::{debug, trace};

/// QR code decoder
///
/// Returns the first grid in the image that decodes cleanly, with its four
/// corners as result points.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QrDecoder {
    fn decode(
        &mut self,
        image: &LuminanceImage,
        hints: &DecodeHints,
    ) -> Result<DecodedSymbol, DecodeError> {
        if !hints.allows(DecodeFormat::QrCode) {
            return Err(DecodeError::FormatNotEnabled);
        }
        if let Some(charset) = &hints.character_set {
            trace!(charset = %charset, "Character set hint ignored by QR decoder");
        }

        let gray = image.as_gray();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            gray.width() as usize,
            gray.height() as usize,
            |x, y| gray.get_pixel(x as u32, y as u32).0[0],
        );

        let grids = prepared.detect_grids();
        trace!(count = grids.len(), "QR grids detected");

        for grid in grids {
            match grid.decode() {
                Ok((meta, content)) => {
                    trace!(version = meta.version.0, "Decoded QR grid");
                    let points = grid
                        .bounds
                        .iter()
                        .map(|p| ResultPoint::new(p.x as f32, p.y as f32))
                        .collect();
                    return Ok(DecodedSymbol {
                        text: content,
                        format: DecodeFormat::QrCode,
                        points,
                    });
                }
                Err(e) => {
                    debug!(error = ?e, "Failed to decode QR grid");
                }
            }
        }

        Err(DecodeError::NotFound)
    }
}
