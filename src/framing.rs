// SPDX-License-Identifier: GPL-3.0-only

//! Scan-window geometry
//!
//! The scan window ("framing rect") is what the UI draws to show the user
//! where to hold the code. It lives in screen coordinates. The decoder needs
//! the same region in preview-buffer coordinates, which is what
//! [`compute_framing_rect_in_preview`] produces.
//!
//! Camera sensors frequently report landscape-native preview sizes while the
//! screen is portrait (or the other way round). When the two orientation
//! conventions disagree the axes have to be swapped while scaling, otherwise
//! the crop silently misses the window the user is looking at.
//!
//! The functions here are pure. [`FramingCache`] memoizes their results for
//! one camera session and is owned by the capture coordinator.

use crate::constants::framing::{
    MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH, MIN_FRAME_HEIGHT, MIN_FRAME_WIDTH, TOP_OFFSET_RATIO,
    WIDTH_RATIO,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Taller than wide
    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }

    /// Either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Parse `"1080x1920"` (also accepts `X` and `×`)
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (w, h) = value
            .split_once('x')
            .or_else(|| value.split_once('X'))
            .or_else(|| value.split_once('×'))?;
        let width = w.trim().parse().ok()?;
        let height = h.trim().parse().ok()?;
        Some(Self { width, height })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle from an origin and a size
    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Zero or negative area
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Fully inside a `width` x `height` buffer anchored at the origin
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.left >= 0
            && self.top >= 0
            && i64::from(self.right) <= i64::from(width)
            && i64::from(self.bottom) <= i64::from(height)
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect({}, {} - {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Scale `resolution` by `ratio` (rounded up), clamped to `[min, max]`
fn desired_dimension(resolution: u32, ratio: (i64, i64), min: i32, max: i32) -> i32 {
    let (num, denom) = (ratio.0 as u64, ratio.1 as u64);
    let dim = (u64::from(resolution) * num).div_ceil(denom);
    let dim = i32::try_from(dim).unwrap_or(i32::MAX);
    dim.clamp(min, max)
}

/// An on-screen scan-window override, if it can be used
///
/// Views that have not been laid out yet report an origin on an axis of
/// zero; those (and empty bounds) fall back to the automatic window.
pub fn resolve_scan_window(scan_window: Option<Rect>) -> Option<Rect> {
    scan_window.filter(|bounds| bounds.left != 0 && bounds.top != 0 && !bounds.is_empty())
}

/// Scan window in screen coordinates
///
/// A resolvable override is used exactly as given. Otherwise the window is
/// square, horizontally centred, with width and top offset derived from the
/// screen size and clamped to the frame limits.
pub fn compute_framing_rect(screen: Resolution, scan_window: Option<Rect>) -> Rect {
    if let Some(bounds) = resolve_scan_window(scan_window) {
        return bounds;
    }

    let width = desired_dimension(screen.width, WIDTH_RATIO, MIN_FRAME_WIDTH, MAX_FRAME_WIDTH);
    // Square window: 2D codes decode best from a square sample
    let height = width;
    let top_offset = desired_dimension(
        screen.height,
        TOP_OFFSET_RATIO,
        MIN_FRAME_HEIGHT,
        MAX_FRAME_HEIGHT,
    );
    let left_offset = (screen.width as i32 - width) / 2;

    Rect::from_origin_size(left_offset, top_offset, width, height)
}

/// Scan window of a requested size, clamped to the screen and centred
pub fn compute_manual_framing_rect(screen: Resolution, width: u32, height: u32) -> Rect {
    let width = width.min(screen.width) as i32;
    let height = height.min(screen.height) as i32;
    let left_offset = (screen.width as i32 - width) / 2;
    let top_offset = (screen.height as i32 - height) / 2;

    Rect::from_origin_size(left_offset, top_offset, width, height)
}

/// Map a screen-space scan window into preview-buffer coordinates
///
/// Returns `None` until both resolutions are known.
pub fn compute_framing_rect_in_preview(
    framing_rect: Rect,
    camera: Option<Resolution>,
    screen: Option<Resolution>,
) -> Option<Rect> {
    let camera = camera.filter(|r| !r.is_empty())?;
    let screen = screen.filter(|r| !r.is_empty())?;

    let scale = |value: i32, to: u32, from: u32| -> i32 {
        (i64::from(value) * i64::from(to) / i64::from(from)) as i32
    };

    let rect = if camera.is_portrait() == screen.is_portrait() {
        Rect::new(
            scale(framing_rect.left, camera.width, screen.width),
            scale(framing_rect.top, camera.height, screen.height),
            scale(framing_rect.right, camera.width, screen.width),
            scale(framing_rect.bottom, camera.height, screen.height),
        )
    } else {
        Rect::new(
            scale(framing_rect.top, camera.width, screen.height),
            scale(framing_rect.left, camera.height, screen.width),
            scale(framing_rect.bottom, camera.width, screen.height),
            scale(framing_rect.right, camera.height, screen.width),
        )
    };

    Some(rect)
}

/// Memoized framing rects for one camera session
///
/// Both rects are computed on first access and kept until something they
/// depend on changes. Dropping the cache (closing the camera) forgets them,
/// including any manual size.
#[derive(Debug, Clone, Default)]
pub struct FramingCache {
    screen: Option<Resolution>,
    camera: Option<Resolution>,
    manual_size: Option<(u32, u32)>,
    scan_window: Option<Rect>,
    framing_rect: Option<Rect>,
    preview_rect: Option<Rect>,
}

impl FramingCache {
    pub fn new(screen: Option<Resolution>, camera: Option<Resolution>) -> Self {
        Self {
            screen,
            camera,
            ..Self::default()
        }
    }

    pub fn screen_resolution(&self) -> Option<Resolution> {
        self.screen
    }

    pub fn camera_resolution(&self) -> Option<Resolution> {
        self.camera
    }

    /// Manual size in effect, if any
    pub fn manual_size(&self) -> Option<(u32, u32)> {
        self.manual_size
    }

    /// Record the screen and preview sizes once the driver reports them
    ///
    /// A manual size or override set earlier is kept.
    pub fn set_resolutions(&mut self, screen: Option<Resolution>, camera: Option<Resolution>) {
        if self.screen != screen || self.camera != camera {
            self.screen = screen;
            self.camera = camera;
            self.invalidate();
        }
    }

    /// Use a fixed-size window instead of the automatic one
    pub fn set_manual_size(&mut self, width: u32, height: u32) {
        self.manual_size = Some((width, height));
        self.invalidate();
    }

    /// Replace (or clear) the on-screen override
    pub fn set_scan_window(&mut self, scan_window: Option<Rect>) {
        if self.scan_window != scan_window {
            self.scan_window = scan_window;
            self.invalidate();
        }
    }

    /// Forget computed rects; the next access recomputes them
    pub fn invalidate(&mut self) {
        self.framing_rect = None;
        self.preview_rect = None;
    }

    /// Scan window in screen coordinates
    pub fn framing_rect(&mut self) -> Option<Rect> {
        if self.framing_rect.is_none() {
            let rect = match self.manual_size {
                Some((width, height)) => {
                    let rect = compute_manual_framing_rect(self.screen?, width, height);
                    debug!(%rect, "Calculated manual framing rect");
                    rect
                }
                None => match resolve_scan_window(self.scan_window) {
                    Some(bounds) => bounds,
                    None => {
                        let rect = compute_framing_rect(self.screen?, None);
                        debug!(%rect, "Calculated framing rect");
                        rect
                    }
                },
            };
            self.framing_rect = Some(rect);
        }
        self.framing_rect
    }

    /// Scan window in preview-buffer coordinates
    pub fn framing_rect_in_preview(&mut self) -> Option<Rect> {
        if self.preview_rect.is_none() {
            let framing_rect = self.framing_rect()?;
            self.preview_rect =
                compute_framing_rect_in_preview(framing_rect, self.camera, self.screen);
        }
        self.preview_rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT_1080P: Resolution = Resolution {
        width: 1080,
        height: 1920,
    };

    #[test]
    fn test_auto_framing_rect_example() {
        let rect = compute_framing_rect(PORTRAIT_1080P, None);
        assert_eq!(rect, Rect::new(168, 472, 912, 1216));
        assert_eq!(rect.width(), 744);
        assert_eq!(rect.width(), rect.height());
    }

    #[test]
    fn test_auto_framing_rect_is_square_centred_and_clamped() {
        for width in (1..=4000).step_by(37) {
            for height in (1..=4000).step_by(53) {
                let screen = Resolution::new(width, height);
                let rect = compute_framing_rect(screen, None);
                assert_eq!(rect.width(), rect.height(), "not square for {}", screen);
                assert!(rect.width() >= MIN_FRAME_WIDTH && rect.width() <= MAX_FRAME_WIDTH);
                assert!(rect.top >= MIN_FRAME_HEIGHT && rect.top <= MAX_FRAME_HEIGHT);
                let centre = rect.left * 2 + rect.width();
                assert!((centre - width as i32).abs() <= 1, "not centred for {}", screen);
            }
        }
    }

    #[test]
    fn test_small_screen_uses_minimum() {
        let rect = compute_framing_rect(Resolution::new(320, 480), None);
        assert_eq!(rect.width(), MIN_FRAME_WIDTH);
        assert_eq!(rect.top, MIN_FRAME_HEIGHT);
        assert_eq!(rect.left, 40);
    }

    #[test]
    fn test_override_replaces_auto_rect() {
        let bounds = Rect::new(100, 300, 700, 900);
        assert_eq!(compute_framing_rect(PORTRAIT_1080P, Some(bounds)), bounds);
    }

    #[test]
    fn test_unresolved_override_falls_back() {
        let auto = compute_framing_rect(PORTRAIT_1080P, None);
        for bounds in [
            Rect::new(0, 0, 600, 600),
            Rect::new(0, 300, 600, 900),
            Rect::new(100, 0, 600, 600),
            Rect::new(100, 300, 100, 900),
        ] {
            assert_eq!(compute_framing_rect(PORTRAIT_1080P, Some(bounds)), auto);
        }
    }

    #[test]
    fn test_manual_framing_rect_example() {
        let rect = compute_manual_framing_rect(PORTRAIT_1080P, 2000, 500);
        assert_eq!(rect, Rect::new(0, 710, 1080, 1210));
    }

    #[test]
    fn test_preview_same_orientation_scales_per_axis() {
        let framing = Rect::new(168, 472, 912, 1216);
        let camera = Resolution::new(540, 960);
        let rect =
            compute_framing_rect_in_preview(framing, Some(camera), Some(PORTRAIT_1080P)).unwrap();
        assert_eq!(rect, Rect::new(84, 236, 456, 608));
    }

    #[test]
    fn test_preview_orientation_mismatch_swaps_axes() {
        let framing = Rect::new(168, 472, 912, 1216);
        let camera = Resolution::new(1920, 1080);
        let rect =
            compute_framing_rect_in_preview(framing, Some(camera), Some(PORTRAIT_1080P)).unwrap();
        // left/right come from top/bottom, top/bottom from left/right
        assert_eq!(
            rect,
            Rect::new(
                472 * 1920 / 1920,
                168 * 1080 / 1080,
                1216 * 1920 / 1920,
                912 * 1080 / 1080
            )
        );
    }

    #[test]
    fn test_preview_needs_both_resolutions() {
        let framing = Rect::new(10, 10, 20, 20);
        assert_eq!(
            compute_framing_rect_in_preview(framing, None, Some(PORTRAIT_1080P)),
            None
        );
        assert_eq!(
            compute_framing_rect_in_preview(framing, Some(PORTRAIT_1080P), None),
            None
        );
        assert_eq!(
            compute_framing_rect_in_preview(
                framing,
                Some(Resolution::new(0, 480)),
                Some(PORTRAIT_1080P)
            ),
            None
        );
    }

    #[test]
    fn test_cache_memoizes_and_invalidates() {
        let mut cache = FramingCache::new(Some(PORTRAIT_1080P), None);
        assert_eq!(cache.framing_rect_in_preview(), None);

        cache.set_resolutions(Some(PORTRAIT_1080P), Some(Resolution::new(1920, 1080)));
        let first = cache.framing_rect_in_preview();
        let second = cache.framing_rect_in_preview();
        assert!(first.is_some());
        assert_eq!(first, second);

        cache.set_manual_size(2000, 500);
        assert_eq!(cache.framing_rect(), Some(Rect::new(0, 710, 1080, 1210)));
        assert_ne!(cache.framing_rect_in_preview(), first);
    }

    #[test]
    fn test_cache_keeps_manual_size_across_driver_open() {
        let mut cache = FramingCache::new(None, None);
        cache.set_manual_size(2000, 500);
        assert_eq!(cache.framing_rect(), None);

        cache.set_resolutions(Some(PORTRAIT_1080P), Some(Resolution::new(1920, 1080)));
        assert_eq!(cache.manual_size(), Some((2000, 500)));
        assert_eq!(cache.framing_rect(), Some(Rect::new(0, 710, 1080, 1210)));
    }

    #[test]
    fn test_cache_override_wins_without_screen() {
        let bounds = Rect::new(50, 60, 250, 260);
        let mut cache = FramingCache::new(None, None);
        assert_eq!(cache.framing_rect(), None);
        cache.set_scan_window(Some(bounds));
        assert_eq!(cache.framing_rect(), Some(bounds));
    }

    #[test]
    fn test_rect_fits_within() {
        assert!(Rect::new(0, 0, 10, 10).fits_within(10, 10));
        assert!(!Rect::new(0, 0, 11, 10).fits_within(10, 10));
        assert!(!Rect::new(-1, 0, 5, 5).fits_within(10, 10));
        assert!(!Rect::new(5, 5, 5, 8).fits_within(10, 10));
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!(Resolution::parse("1080x1920"), Some(PORTRAIT_1080P));
        assert_eq!(Resolution::parse(" 640 X 480 "), Some(Resolution::new(640, 480)));
        assert_eq!(Resolution::parse("640"), None);
        assert!(PORTRAIT_1080P.is_portrait());
    }
}
