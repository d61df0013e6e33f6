// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source
//!
//! Serves image files as if they were camera preview frames, so the capture
//! pipeline can run without camera hardware. Every image is converted to
//! 8-bit luminance and scaled to the size of the first image, which plays
//! the role of the negotiated preview size.

use super::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use super::{CameraControls, FrameSource};
use crate::constants::preview::{STILL_FRAME_INTERVAL, is_image_extension};
use crate::framing::Resolution;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Load an image file as a luminance frame
pub fn load_image_as_frame(path: &Path, size: Option<Resolution>) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !is_image_extension(&extension) {
        return Err(BackendError::Other(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    debug!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let mut luma = img.to_luma8();
    if let Some(size) = size
        && (luma.width() != size.width || luma.height() != size.height)
    {
        luma = image::imageops::resize(&luma, size.width, size.height, FilterType::Triangle);
    }

    let width = luma.width();
    let height = luma.height();
    Ok(CameraFrame::new(
        width,
        height,
        PixelFormat::Gray8,
        luma.into_raw(),
    ))
}

/// Frame source backed by a list of image files
pub struct StillImageSource {
    paths: Vec<PathBuf>,
    frames: Vec<CameraFrame>,
    resolution: Option<Resolution>,
    /// Index of the next frame to serve
    position: usize,
    /// Start again from the first image after the last one
    cycle: bool,
    frame_interval: Duration,
    open: bool,
    previewing: bool,
    torch: bool,
}

impl StillImageSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            frames: Vec::new(),
            resolution: None,
            position: 0,
            cycle: true,
            frame_interval: STILL_FRAME_INTERVAL,
            open: false,
            previewing: false,
            torch: false,
        }
    }

    /// Stop after the last image instead of starting over
    pub fn with_cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    /// Change the delay between frames
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl FrameSource for StillImageSource {
    fn open_driver(&mut self) -> BackendResult<()> {
        if self.open {
            return Ok(());
        }
        if self.paths.is_empty() {
            return Err(BackendError::DeviceNotFound("No image files given".to_string()));
        }

        let first = load_image_as_frame(&self.paths[0], None)?;
        let size = Resolution::new(first.width, first.height);
        if size.is_empty() {
            return Err(BackendError::InitializationFailed(format!(
                "'{}' has no pixels",
                self.paths[0].display()
            )));
        }

        let mut frames = vec![first];
        for path in &self.paths[1..] {
            frames.push(load_image_as_frame(path, Some(size))?);
        }

        info!(count = frames.len(), resolution = %size, "Opened still-image source");

        self.frames = frames;
        self.resolution = Some(size);
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn close_driver(&mut self) {
        if self.open {
            debug!("Closing still-image source");
        }
        self.open = false;
        self.previewing = false;
        self.torch = false;
        self.frames.clear();
        self.resolution = None;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn camera_resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn start_preview(&mut self) -> BackendResult<()> {
        if !self.open {
            return Err(BackendError::NotOpen);
        }
        self.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) {
        self.previewing = false;
    }

    async fn next_frame(&mut self) -> Option<CameraFrame> {
        if !self.previewing || self.frames.is_empty() {
            return None;
        }

        if self.position >= self.frames.len() {
            if !self.cycle {
                debug!("Still-image source exhausted");
                return None;
            }
            self.position = 0;
        }

        tokio::time::sleep(self.frame_interval).await;

        let mut frame = self.frames[self.position].clone();
        frame.captured_at = std::time::Instant::now();
        self.position += 1;
        Some(frame)
    }
}

impl CameraControls for StillImageSource {
    fn torch(&self) -> bool {
        self.torch
    }

    fn set_torch(&mut self, on: bool) -> BackendResult<()> {
        if !self.open {
            return Err(BackendError::NotOpen);
        }
        self.torch = on;
        Ok(())
    }
}
