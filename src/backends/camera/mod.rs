// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The capture coordinator only needs two things from a camera: a stream of
//! preview frames it can pull one at a time, and a handful of side controls
//! (focus, torch, zoom).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ CaptureCoordinator  │  ← Session lifecycle, one frame request at a time
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ FrameSource +       │  ← Common interface
//! │ CameraControls      │
//! └──────────┬──────────┘
//!            │
//!            ▼
//!   ┌──────────────────┐
//!   │ StillImageSource │  ← Concrete implementation (image files)
//!   └──────────────────┘
//! ```

pub mod file_source;
pub mod types;

pub use file_source::StillImageSource;
pub use types::*;

use crate::framing::Resolution;
use std::future::Future;

/// Source of preview frames
///
/// Frames are pulled: the coordinator awaits [`next_frame`](Self::next_frame)
/// only while it wants a frame, so nothing is delivered while a decode is in
/// flight.
pub trait FrameSource: Send {
    // ===== Lifecycle =====

    /// Open the camera driver and negotiate preview parameters
    ///
    /// # Returns
    /// * `Ok(())` - Driver open, preview size known or about to be
    /// * `Err(BackendError)` - Driver failed; the session cannot start
    fn open_driver(&mut self) -> BackendResult<()>;

    /// Release the camera driver. Safe to call when already closed.
    fn close_driver(&mut self);

    /// Check if the driver is open
    fn is_open(&self) -> bool;

    /// Preview buffer size, once the driver has negotiated one
    fn camera_resolution(&self) -> Option<Resolution>;

    // ===== Preview =====

    /// Begin producing preview frames
    fn start_preview(&mut self) -> BackendResult<()>;

    /// Stop producing preview frames
    fn stop_preview(&mut self);

    /// Wait for the next preview frame
    ///
    /// Resolves to `None` when the preview stream has ended for good.
    /// Must be cancel safe: dropping the future before it resolves must not
    /// lose a frame or leave the source in a different state.
    fn next_frame(&mut self) -> impl Future<Output = Option<CameraFrame>> + Send;
}

/// Camera side controls
///
/// Defaults describe a fixed-focus camera with no torch and no zoom.
pub trait CameraControls {
    /// Check if the camera can run auto-focus cycles
    fn supports_auto_focus(&self) -> bool {
        false
    }

    /// Start one auto-focus cycle
    fn auto_focus(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Abort any running auto-focus cycle
    fn cancel_auto_focus(&mut self) {}

    /// Check if the camera can keep itself in focus without requests
    fn supports_continuous_focus(&self) -> bool {
        false
    }

    /// Switch continuous focus on or off
    fn set_continuous_focus(&mut self, _on: bool) -> BackendResult<()> {
        Err(BackendError::NotAvailable("no continuous focus".to_string()))
    }

    /// Current torch state
    fn torch(&self) -> bool {
        false
    }

    /// Switch the torch on or off
    fn set_torch(&mut self, on: bool) -> BackendResult<()> {
        if on {
            Err(BackendError::NotAvailable("no torch".to_string()))
        } else {
            Ok(())
        }
    }

    /// Zoom support and current step
    fn zoom_capabilities(&self) -> ZoomCapabilities {
        ZoomCapabilities::default()
    }

    /// Set the zoom step
    fn set_zoom(&mut self, _zoom: u32) -> BackendResult<()> {
        Err(BackendError::NotAvailable("zoom not supported".to_string()))
    }
}
