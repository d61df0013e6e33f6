// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main pipeline error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera driver errors
    Backend(BackendError),
    /// Capture session errors
    Capture(CaptureError),
    /// Decode worker errors
    Worker(WorkerError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Errors reported by a [`Decoder`](crate::frame_processor::Decoder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No symbol could be read from the image (expected, drives a retry)
    NotFound,
    /// None of the configured formats is supported by this decoder
    FormatNotEnabled,
}

/// Decode worker errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A decode is already in flight
    Busy,
    /// The worker is shutting down or has stopped
    ShuttingDown,
    /// The worker thread exited unexpectedly
    Disconnected,
    /// The worker thread could not be started
    SpawnFailed(String),
}

/// Capture session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Camera driver failure; ends the session
    Framework(BackendError),
    /// Preview framing rect does not fit inside the delivered frame
    CropOutOfBounds {
        frame_width: u32,
        frame_height: u32,
    },
    /// Decode worker could not take a frame; ends the session
    Worker(WorkerError),
    /// The preview stream stopped delivering frames; ends the session
    PreviewEnded,
    /// The capture coordinator is no longer running
    Stopped,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Backend(e) => write!(f, "Camera error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Worker(e) => write!(f, "Decode worker error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotFound => write!(f, "No barcode found"),
            DecodeError::FormatNotEnabled => write!(f, "No supported barcode format enabled"),
        }
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Busy => write!(f, "A decode is already in flight"),
            WorkerError::ShuttingDown => write!(f, "Decode worker is shutting down"),
            WorkerError::Disconnected => write!(f, "Decode worker thread exited"),
            WorkerError::SpawnFailed(msg) => write!(f, "Failed to start decode worker: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Framework(e) => write!(f, "Camera framework error: {}", e),
            CaptureError::CropOutOfBounds {
                frame_width,
                frame_height,
            } => write!(
                f,
                "Framing rect does not fit in {}x{} frame",
                frame_width, frame_height
            ),
            CaptureError::Worker(e) => write!(f, "Decode worker failed: {}", e),
            CaptureError::PreviewEnded => write!(f, "Preview stream ended"),
            CaptureError::Stopped => write!(f, "Capture coordinator has stopped"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for WorkerError {}
impl std::error::Error for CaptureError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<WorkerError> for AppError {
    fn from(err: WorkerError) -> Self {
        AppError::Worker(err)
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        CaptureError::Framework(err)
    }
}

impl From<WorkerError> for CaptureError {
    fn from(err: WorkerError) -> Self {
        CaptureError::Worker(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
