// SPDX-License-Identifier: GPL-3.0-only

//! Pinch-to-zoom gesture tracking
//!
//! Zoom follows the change in spacing between two touch points, one step
//! per sample, so a slow pinch and a fast pinch of the same length end up
//! at different zoom levels.

use crate::backends::camera::ZoomCapabilities;

/// Direction of one zoom step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// Tracks finger spacing across the samples of one pinch gesture
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PinchZoomTracker {
    last_spacing: Option<f32>,
}

impl PinchZoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one gesture sample
    ///
    /// The first sample of a gesture only records the spacing. Later ones
    /// compare against the previous sample and replace it.
    pub fn update(&mut self, spacing: f32) -> Option<ZoomStep> {
        let previous = self.last_spacing.replace(spacing)?;
        if spacing > previous {
            Some(ZoomStep::In)
        } else if spacing < previous {
            Some(ZoomStep::Out)
        } else {
            None
        }
    }

    /// Forget the gesture (fingers lifted)
    pub fn reset(&mut self) {
        self.last_spacing = None;
    }
}

/// Zoom value to request for a step, if the camera allows one
pub fn next_zoom(step: ZoomStep, caps: ZoomCapabilities) -> Option<u32> {
    if !caps.supported {
        return None;
    }
    match step {
        ZoomStep::In if caps.zoom < caps.max_zoom => Some(caps.zoom + 1),
        ZoomStep::Out if caps.zoom > 0 => Some(caps.zoom - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(zoom: u32, max_zoom: u32) -> ZoomCapabilities {
        ZoomCapabilities {
            supported: true,
            max_zoom,
            zoom,
        }
    }

    #[test]
    fn test_delta_based_steps() {
        let mut tracker = PinchZoomTracker::new();
        assert_eq!(tracker.update(100.0), None);
        assert_eq!(tracker.update(120.0), Some(ZoomStep::In));
        assert_eq!(tracker.update(125.0), Some(ZoomStep::In));
        assert_eq!(tracker.update(110.0), Some(ZoomStep::Out));
        assert_eq!(tracker.update(110.0), None);

        tracker.reset();
        assert_eq!(tracker.update(50.0), None);
    }

    #[test]
    fn test_next_zoom_bounds() {
        assert_eq!(next_zoom(ZoomStep::In, caps(0, 3)), Some(1));
        assert_eq!(next_zoom(ZoomStep::In, caps(3, 3)), None);
        assert_eq!(next_zoom(ZoomStep::Out, caps(2, 3)), Some(1));
        assert_eq!(next_zoom(ZoomStep::Out, caps(0, 3)), None);
        assert_eq!(next_zoom(ZoomStep::In, ZoomCapabilities::default()), None);
    }
}
