// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the capture pipeline
//!
//! This module provides command-line functionality for:
//! - Scanning image files through the full capture pipeline
//! - Printing the scan window for a screen/camera combination

use qrcapture::backends::camera::StillImageSource;
use qrcapture::capture::{CaptureCoordinator, CaptureHandle, ResultConsumer};
use qrcapture::config::{Config, DecodeFormat};
use qrcapture::errors::CaptureError;
use qrcapture::frame_processor::{DecodeResult, Decoder, QrDecoder, ResultPoint};
use qrcapture::framing::{FramingCache, Rect, Resolution};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Options for `qrcapture scan`
pub struct ScanOptions {
    pub files: Vec<PathBuf>,
    pub screen: Option<Resolution>,
    pub framing: Option<Resolution>,
    pub scan_window: Option<Rect>,
    pub config: Option<PathBuf>,
    pub continuous: bool,
    pub invert: bool,
}

/// One decoded result, printed as a JSON line
#[derive(Serialize)]
struct ScanRecord<'a> {
    text: &'a str,
    format: DecodeFormat,
    points: &'a [ResultPoint],
    scale_factor: f32,
    thumbnail: Option<Resolution>,
}

/// Prints results and decides when scanning is over
struct ConsoleConsumer {
    handle: CaptureHandle,
    continuous: bool,
    restart_delay_ms: u64,
    results: usize,
    error: Option<CaptureError>,
}

impl ConsoleConsumer {
    fn new(handle: CaptureHandle, continuous: bool, restart_delay_ms: u64) -> Self {
        Self {
            handle,
            continuous,
            restart_delay_ms,
            results: 0,
            error: None,
        }
    }

    fn finish(&self) {
        if let Err(e) = self.handle.shutdown() {
            debug!(error = %e, "Coordinator already stopped");
        }
    }
}

impl ResultConsumer for ConsoleConsumer {
    fn on_result(&mut self, result: DecodeResult) {
        self.results += 1;

        let record = ScanRecord {
            text: &result.text,
            format: result.format,
            points: &result.points,
            scale_factor: result.scale_factor,
            thumbnail: result
                .thumbnail
                .as_ref()
                .map(|t| Resolution::new(t.width(), t.height())),
        };
        match serde_json::to_string(&record) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to serialize result"),
        }

        if self.continuous {
            if let Err(e) = self.handle.restart_after_delay(self.restart_delay_ms) {
                debug!(error = %e, "Coordinator already stopped");
            }
        } else {
            self.finish();
        }
    }

    fn on_framework_error(&mut self, error: CaptureError) {
        match error {
            CaptureError::PreviewEnded => info!("All images scanned"),
            ref other => warn!(error = %other, "Capture failed"),
        }
        self.error = Some(error);
        self.finish();
    }
}

/// Run the capture pipeline over image files
pub fn scan_files(options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let consumer = run_scan(options, QrDecoder::new())?;

    match consumer.error {
        Some(CaptureError::PreviewEnded) | None if consumer.results > 0 => Ok(()),
        Some(CaptureError::PreviewEnded) | None => Err("No barcode found".into()),
        Some(error) => Err(error.into()),
    }
}

/// Square window to use when the automatic one does not fit the images
///
/// The automatic window assumes a phone-shaped portrait screen. On a
/// landscape or square image it runs off the bottom of the frame and every
/// crop would be dropped.
fn fitting_framing(screen: Resolution, camera: Resolution) -> Option<Resolution> {
    let mut cache = FramingCache::new(Some(screen), Some(camera));
    let fits = cache
        .framing_rect_in_preview()
        .is_some_and(|rect| rect.fits_within(camera.width, camera.height));
    if fits {
        return None;
    }

    let side = screen.width.min(screen.height);
    Some(Resolution::new(side, side))
}

fn run_scan<D>(options: ScanOptions, decoder: D) -> Result<ConsoleConsumer, Box<dyn std::error::Error>>
where
    D: Decoder + Clone + 'static,
{
    let mut config = Config::load_or_default(options.config.as_deref());
    if options.invert {
        config.invert_scan = true;
    }
    let restart_delay_ms = config.restart_delay_ms;

    let mut framing = options.framing;
    if framing.is_none()
        && options.scan_window.is_none()
        && let Some(first) = options.files.first()
    {
        match image::image_dimensions(first) {
            Ok((width, height)) => {
                let camera = Resolution::new(width, height);
                let screen = options.screen.unwrap_or(camera);
                framing = fitting_framing(screen, camera);
                if let Some(size) = framing {
                    info!(
                        images = %camera,
                        window = %size,
                        "Automatic scan window does not fit the images, using a square one"
                    );
                }
            }
            Err(e) => debug!(error = %e, "Could not read image size"),
        }
    }

    let source = StillImageSource::new(options.files).with_cycle(false);
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let (coordinator, handle) = CaptureCoordinator::new(source, decoder, config, options.screen);

        if let Some(size) = framing {
            handle.set_manual_framing_rect(size.width, size.height)?;
        }
        if options.scan_window.is_some() {
            handle.set_scan_window_override(options.scan_window)?;
        }

        let consumer = ConsoleConsumer::new(handle.clone(), options.continuous, restart_delay_ms);
        let task = coordinator.spawn(consumer);
        handle.open()?;
        drop(handle);

        let consumer = task.await?;
        Ok::<_, Box<dyn std::error::Error>>(consumer)
    })
}

#[derive(Serialize)]
struct FramingReport {
    screen: Resolution,
    camera: Resolution,
    framing_rect: Rect,
    preview_rect: Rect,
}

/// Print the scan window in screen and preview coordinates
pub fn print_framing(
    screen: Resolution,
    camera: Resolution,
    framing: Option<Resolution>,
    scan_window: Option<Rect>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = FramingCache::new(Some(screen), Some(camera));
    cache.set_scan_window(scan_window);
    if let Some(size) = framing {
        cache.set_manual_size(size.width, size.height);
    }

    let framing_rect = cache
        .framing_rect()
        .ok_or("Could not compute the framing rect")?;
    let preview_rect = cache
        .framing_rect_in_preview()
        .ok_or("Could not map the framing rect into the preview")?;

    if json {
        let report = FramingReport {
            screen,
            camera,
            framing_rect,
            preview_rect,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Screen:  {}", screen);
    println!("Camera:  {}", camera);
    if screen.is_portrait() != camera.is_portrait() {
        println!("         (orientations differ, axes swapped)");
    }
    println!();
    println!(
        "Framing rect (screen):  {}  {}x{}",
        framing_rect,
        framing_rect.width(),
        framing_rect.height()
    );
    println!(
        "Framing rect (preview): {}  {}x{}",
        preview_rect,
        preview_rect.width(),
        preview_rect.height()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrcapture::config::DecodeHints;
    use qrcapture::errors::DecodeError;
    use qrcapture::frame_processor::{DecodedSymbol, LuminanceImage};

    fn always_found(_: &LuminanceImage, _: &DecodeHints) -> Result<DecodedSymbol, DecodeError> {
        Ok(DecodedSymbol::new("payload", DecodeFormat::QrCode))
    }

    fn options(files: Vec<PathBuf>) -> ScanOptions {
        ScanOptions {
            files,
            screen: None,
            framing: None,
            scan_window: None,
            config: Some(PathBuf::from("/nonexistent/qrcapture.json")),
            continuous: false,
            invert: false,
        }
    }

    #[test]
    fn test_fitting_framing() {
        let portrait = Resolution::new(1080, 1920);
        assert_eq!(fitting_framing(portrait, portrait), None);

        let landscape = Resolution::new(640, 480);
        assert_eq!(
            fitting_framing(landscape, landscape),
            Some(Resolution::new(480, 480))
        );

        let mut cache = FramingCache::new(Some(landscape), Some(landscape));
        cache.set_manual_size(480, 480);
        let rect = cache.framing_rect_in_preview().unwrap();
        assert!(rect.fits_within(640, 480));
    }

    #[test]
    fn test_scan_landscape_image() {
        let dir = std::env::temp_dir().join(format!("qrcapture-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("landscape.png");
        image::GrayImage::from_pixel(640, 480, image::Luma([128]))
            .save(&path)
            .unwrap();

        let consumer = run_scan(options(vec![path]), always_found).unwrap();
        assert_eq!(consumer.results, 1);
        assert_eq!(consumer.error, None);
        std::fs::remove_dir_all(&dir).ok();
    }
}
