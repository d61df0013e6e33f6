// SPDX-License-Identifier: GPL-3.0-only

//! Decoder strategies
//!
//! Each task implements [`Decoder`](super::Decoder) for the symbologies it
//! understands.

pub mod qr_detector;

pub use qr_detector::QrDecoder;
