// SPDX-License-Identifier: GPL-3.0-only

//! qrcapture - scanning pipeline for a barcode-capture component
//!
//! Turns a stream of camera preview frames into decoded barcode payloads,
//! one decode at a time, and keeps the on-screen scan window and the
//! preview-buffer crop in agreement.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`framing`]: Scan-window geometry in screen and preview coordinates
//! - [`backends`]: Frame source and camera control abstraction
//! - [`frame_processor`]: Luminance crops, decoder strategies and the decode worker
//! - [`capture`]: Session state machine and the async coordinator
//! - [`config`]: Pipeline configuration
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load_or_default(None);
//! let source = StillImageSource::new(paths);
//! let (coordinator, handle) =
//!     CaptureCoordinator::new(source, QrDecoder::new(), config, None);
//! let task = coordinator.spawn(consumer);
//! handle.open()?;
//! ```

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod framing;

// Re-export commonly used types
pub use capture::{CaptureCoordinator, CaptureHandle, CaptureState, ResultConsumer};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use frame_processor::{DecodeResult, Decoder, QrDecoder};
pub use framing::{Rect, Resolution};
