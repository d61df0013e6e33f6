// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordination
//!
//! Ties the frame source, the decode worker and the side controls (focus,
//! torch, zoom) into one scanning loop with exactly one decode in flight:
//!
//! ```text
//! request frame → crop to scan window → decode ─┬─ not found → request frame
//!                                               └─ result → beep, deliver, wait for restart
//! ```
//!
//! [`CaptureMachine`] holds the transition rules, [`CaptureCoordinator`]
//! runs them on a tokio task.

pub mod auto_focus;
pub mod coordinator;
pub mod feedback;
pub mod machine;
pub mod session;
pub mod zoom;

pub use auto_focus::AutoFocusManager;
pub use coordinator::{CaptureCoordinator, CaptureHandle};
pub use feedback::{BeepManager, LogFeedback, ResultConsumer, ScanFeedback};
pub use machine::{CaptureMachine, CaptureState, Effect};
pub use session::{CaptureSession, SessionToken};
pub use zoom::{PinchZoomTracker, ZoomStep};
