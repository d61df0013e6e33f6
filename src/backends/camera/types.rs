// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a preview frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// NV21 - Semi-planar 4:2:0 (Y plane followed by interleaved VU)
    /// Default preview format on mobile camera stacks
    Nv21,
    /// Gray8 - 8-bit luminance, one byte per pixel
    Gray8,
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel in the first (luminance-bearing) plane
    pub fn luma_bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Nv21 | PixelFormat::Gray8 => 1,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A single preview frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data; for NV21 the luminance plane comes first
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride of the first plane in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap a tightly packed buffer
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            stride: width * format.luma_bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }
}

/// Zoom support reported by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoomCapabilities {
    pub supported: bool,
    /// Highest zoom step
    pub max_zoom: u32,
    /// Current zoom step (0 = no zoom)
    pub zoom: u32,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Camera driver errors
pub type DriverError = BackendError;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No camera driver available on this system
    NotAvailable(String),
    /// Failed to open or initialize the driver
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Driver rejected the negotiated parameters
    ParametersRejected(String),
    /// Operation needs an open driver
    NotOpen,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Camera not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::ParametersRejected(msg) => {
                write!(f, "Camera rejected parameters: {}", msg)
            }
            BackendError::NotOpen => write!(f, "Camera driver is not open"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
