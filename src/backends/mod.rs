// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for frame capture
//!
//! The capture pipeline never talks to camera hardware directly. It goes
//! through the traits in [`camera`], which a platform driver (or the
//! still-image source used by the command line) implements:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Capture Coordinator             │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────────────────────────┐   │
//! │  │ Camera (FrameSource + CameraControls) │   │
//! │  └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Frame source contract, frame types and the still-image source

pub mod camera;
