// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

/// Scan-window sizing
///
/// The automatic window is sized from the screen resolution against a
/// 375x668 reference layout: a 258px wide window whose top edge sits 164px
/// from the top of the screen.
pub mod framing {
    /// Smallest automatic window width in screen pixels
    pub const MIN_FRAME_WIDTH: i32 = 240;

    /// Smallest automatic window top offset in screen pixels
    pub const MIN_FRAME_HEIGHT: i32 = 240;

    /// Largest automatic window width in screen pixels
    pub const MAX_FRAME_WIDTH: i32 = 1920;

    /// Largest automatic window top offset in screen pixels
    pub const MAX_FRAME_HEIGHT: i32 = 1080;

    /// Window width relative to screen width (numerator, denominator)
    pub const WIDTH_RATIO: (i64, i64) = (258, 375);

    /// Window top offset relative to screen height (numerator, denominator)
    pub const TOP_OFFSET_RATIO: (i64, i64) = (164, 668);
}

/// Decode worker constants
pub mod decode {
    /// Thumbnails attached to decode results are this many times smaller
    /// than the cropped scan image on each axis
    pub const THUMBNAIL_SCALE_FACTOR: u32 = 2;

    /// Name given to the decode worker thread
    pub const WORKER_THREAD_NAME: &str = "qrcapture-decode";
}

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Interval between auto-focus requests while previewing
    pub const AUTO_FOCUS_INTERVAL: Duration = Duration::from_millis(2000);

    /// Delay before resuming preview when the consumer does not pick one
    pub const DEFAULT_RESTART_DELAY_MS: u64 = 0;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// Still-image preview constants
pub mod preview {
    use std::time::Duration;

    /// Delay between frames served by the still-image source (~15fps)
    pub const STILL_FRAME_INTERVAL: Duration = Duration::from_millis(66);

    /// File extensions the still-image source accepts
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff"];

    /// Check if a (lowercase) extension is a supported image file
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}
