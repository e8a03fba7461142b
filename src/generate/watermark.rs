use std::io::Cursor;
use std::path::PathBuf;

use image::{imageops, ImageFormat};

use crate::errors::KioskError;

/// Stamps a branding overlay onto a finished composition.
///
/// Implementations may block on IO or decoding; callers run them on
/// the blocking thread pool.
pub trait Watermark: Send + Sync {
    fn apply(&self, image: Vec<u8>) -> Result<Vec<u8>, KioskError>;
}

// ---------------------------------------------------------------------------
// PngOverlayWatermark
// ---------------------------------------------------------------------------

const MARGIN: i64 = 16;

/// Composites a PNG overlay into the bottom-right corner of the image.
///
/// A missing overlay asset is not an error: the image passes through
/// untouched so generation keeps working while branding is unconfigured.
pub struct PngOverlayWatermark {
    overlay_path: PathBuf,
}

impl PngOverlayWatermark {
    pub fn new(overlay_path: PathBuf) -> Self {
        Self { overlay_path }
    }
}

impl Watermark for PngOverlayWatermark {
    fn apply(&self, image_bytes: Vec<u8>) -> Result<Vec<u8>, KioskError> {
        if !self.overlay_path.exists() {
            tracing::debug!(
                "Watermark asset {} missing, passing image through",
                self.overlay_path.display()
            );
            return Ok(image_bytes);
        }

        let overlay_bytes = std::fs::read(&self.overlay_path)?;
        let overlay = image::load_from_memory(&overlay_bytes)
            .map_err(|e| KioskError::Persistence(format!("bad watermark asset: {}", e)))?;
        let mut base = image::load_from_memory(&image_bytes)
            .map_err(|e| KioskError::ExternalGeneration(format!("undecodable image: {}", e)))?;

        let x = base.width() as i64 - overlay.width() as i64 - MARGIN;
        let y = base.height() as i64 - overlay.height() as i64 - MARGIN;
        imageops::overlay(&mut base, &overlay, x.max(0), y.max(0));

        let mut out = Cursor::new(Vec::new());
        base.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| KioskError::Persistence(format!("re-encode failed: {}", e)))?;
        Ok(out.into_inner())
    }
}

// ---------------------------------------------------------------------------
// PassthroughWatermark
// ---------------------------------------------------------------------------

/// No-op watermark for tests and unbranded deployments.
pub struct PassthroughWatermark;

impl Watermark for PassthroughWatermark {
    fn apply(&self, image: Vec<u8>) -> Result<Vec<u8>, KioskError> {
        Ok(image)
    }
}
