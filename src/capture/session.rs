// SPDX-License-Identifier: GPL-3.0-only

//! Per-session capture state

use super::zoom::PinchZoomTracker;
use crate::framing::FramingCache;

/// Identifies one camera session
///
/// Tokens only grow. Anything tagged with a token other than the live
/// session's (worker reports, focus ticks, restart timers) is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The token after this one
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State that lives from camera open to camera close
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub token: SessionToken,
    pub is_previewing: bool,
    pub is_decode_in_flight: bool,
    /// Text of the result currently on show
    pub last_result: Option<String>,
    /// Counts results shown; restart timers are only valid for the current one
    pub result_generation: u64,
    /// Memoized framing rects; dropped with the session
    pub framing: FramingCache,
    pub zoom: PinchZoomTracker,
    /// Auto-focus ticks are running for this session
    pub auto_focus_active: bool,
    /// Frames delivered so far, for periodic logging
    pub frames_seen: u64,
}

impl CaptureSession {
    pub fn new(token: SessionToken, framing: FramingCache) -> Self {
        Self {
            token,
            is_previewing: false,
            is_decode_in_flight: false,
            last_result: None,
            result_generation: 0,
            framing,
            zoom: PinchZoomTracker::new(),
            auto_focus_active: false,
            frames_seen: 0,
        }
    }

    /// Manual window size in effect for this session
    pub fn requested_framing_size(&self) -> Option<(u32, u32)> {
        self.framing.manual_size()
    }
}
