// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing for barcode capture
//!
//! Cropped preview images are decoded off the control task by a single
//! [`DecodeWorker`]. What "decode" means is left to a [`Decoder`] strategy
//! injected at worker start; the default is the QR decoder in
//! [`tasks::qr_detector`].

pub mod luminance;
pub mod tasks;
pub mod worker;

pub use luminance::LuminanceImage;
pub use tasks::qr_detector::QrDecoder;
pub use worker::{DecodeWorker, WorkerState};

use crate::config::{DecodeFormat, DecodeHints};
use crate::errors::DecodeError;
use serde::Serialize;

/// A point of interest on a decoded symbol, in crop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultPoint {
    pub x: f32,
    pub y: f32,
}

impl ResultPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// What a [`Decoder`] reads out of one image
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    pub text: String,
    pub format: DecodeFormat,
    /// Corner or finder points, in the coordinates of the decoded image
    pub points: Vec<ResultPoint>,
}

impl DecodedSymbol {
    pub fn new(text: impl Into<String>, format: DecodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
            points: Vec::new(),
        }
    }
}

/// A successful decode as reported by the worker
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeResult {
    pub text: String,
    pub format: DecodeFormat,
    pub points: Vec<ResultPoint>,
    /// Downscaled copy of the image that was decoded
    pub thumbnail: Option<LuminanceImage>,
    /// Thumbnail width divided by decoded image width
    pub scale_factor: f32,
}

impl DecodeResult {
    /// Check if the payload has any visible content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Outcome of one submission to the decode worker
pub type DecodeOutcome = Result<DecodeResult, DecodeError>;

/// Barcode decoding strategy
///
/// Implementations are moved onto the worker thread and called once per
/// submitted image. `NotFound` is the normal answer for frames without a
/// readable symbol.
pub trait Decoder: Send {
    fn decode(
        &mut self,
        image: &LuminanceImage,
        hints: &DecodeHints,
    ) -> Result<DecodedSymbol, DecodeError>;
}

impl<F> Decoder for F
where
    F: FnMut(&LuminanceImage, &DecodeHints) -> Result<DecodedSymbol, DecodeError> + Send,
{
    fn decode(
        &mut self,
        image: &LuminanceImage,
        hints: &DecodeHints,
    ) -> Result<DecodedSymbol, DecodeError> {
        self(image, hints)
    }
}
