use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageReader, Rgb, RgbImage, RgbaImage};

use crate::error::CaptureError;

/// Largest raster a capture may produce, in pixels.
pub const MAX_RASTER_PIXELS: u64 = 1 << 28;

/// Largest raster side; image XObject dimensions are PDF integers.
pub const MAX_RASTER_SIDE: u32 = i32::MAX as u32;

/// Settings for a single capture.
#[derive(Clone, Debug)]
pub struct CaptureOptions {
    /// Device pixels per layout pixel. Must be at least 1.
    pub scale: f32,
    /// Fill behind transparent content.
    pub background: [u8; 3],
    /// Natural scroll width of the region; the raster is cropped or padded to it.
    pub width_hint: Option<u32>,
    pub height_hint: Option<u32>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: [255, 255, 255],
            width_hint: None,
            height_hint: None,
        }
    }
}

impl CaptureOptions {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.scale.is_finite() || self.scale < 1.0 {
            return Err(CaptureError::InvalidOptions(format!(
                "scale must be a finite value >= 1, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    fn scaled(&self, px: u32) -> Result<u32, CaptureError> {
        let scaled = (f64::from(px) * f64::from(self.scale)).round();
        if scaled > f64::from(MAX_RASTER_SIDE) {
            return Err(CaptureError::InvalidOptions(format!(
                "{px}px at scale {} exceeds the maximum raster side",
                self.scale
            )));
        }
        Ok(scaled as u32)
    }

    /// Output raster size for a region of `width` x `height` layout pixels.
    pub fn raster_size(&self, width: u32, height: u32) -> Result<(u32, u32), CaptureError> {
        let (w, h) = (self.scaled(width)?, self.scaled(height)?);
        if u64::from(w) * u64::from(h) > MAX_RASTER_PIXELS {
            return Err(CaptureError::InvalidOptions(format!(
                "{w}x{h} raster exceeds {MAX_RASTER_PIXELS} pixels"
            )));
        }
        Ok((w, h))
    }
}

/// A captured region: opaque RGB pixels with the background already flattened.
#[derive(Clone, Debug)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Solid raster of the given size, mostly useful as a stand-in capture.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            pixels: RgbImage::from_pixel(width, height, Rgb(color)),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Turns a handle to a rendered region into a raster image.
///
/// Capture is injected rather than reaching into a global rendering
/// environment, so the export pipeline can run against any backend or a
/// test double with fixed dimensions.
pub trait Rasterizer {
    type Region: ?Sized;

    fn capture_region(
        &self,
        region: &Self::Region,
        options: &CaptureOptions,
    ) -> Result<RasterImage, CaptureError>;
}

/// Captures from a pre-rendered snapshot (PNG or JPEG) of the document view.
///
/// The region handle is the snapshot path; a missing file is reported the
/// same way an unmounted view would be.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapshotRasterizer;

impl Rasterizer for SnapshotRasterizer {
    type Region = Path;

    fn capture_region(
        &self,
        region: &Path,
        options: &CaptureOptions,
    ) -> Result<RasterImage, CaptureError> {
        options.validate()?;
        if !region.is_file() {
            return Err(CaptureError::RegionUnavailable(region.to_path_buf()));
        }

        let snapshot = ImageReader::open(region)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| CaptureError::Rasterize(format!("{}: {e}", region.display())))?
            .decode()
            .map_err(|e| CaptureError::Rasterize(format!("{}: {e}", region.display())))?
            .to_rgba8();

        let natural_w = options.width_hint.unwrap_or(snapshot.width());
        let natural_h = options.height_hint.unwrap_or(snapshot.height());
        let (out_w, out_h) = options.raster_size(natural_w, natural_h)?;

        let mut raster = RgbImage::from_pixel(out_w, out_h, Rgb(options.background));

        // Crop to the natural size before upscaling.
        let visible = (natural_w.min(snapshot.width()), natural_h.min(snapshot.height()));
        let snapshot = if visible == snapshot.dimensions() {
            snapshot
        } else {
            imageops::crop_imm(&snapshot, 0, 0, visible.0, visible.1).to_image()
        };
        let (snap_w, snap_h) = options.raster_size(snapshot.width(), snapshot.height())?;
        if snap_w > 0 && snap_h > 0 && out_w > 0 && out_h > 0 {
            let scaled = if (snap_w, snap_h) == snapshot.dimensions() {
                snapshot
            } else {
                imageops::resize(&snapshot, snap_w, snap_h, FilterType::Lanczos3)
            };
            flatten_onto(&mut raster, &scaled);
        }

        log::debug!(
            "Captured {}: snapshot {}x{}, raster {}x{} at scale {}",
            region.display(),
            natural_w,
            natural_h,
            out_w,
            out_h,
            options.scale,
        );

        Ok(RasterImage::new(raster))
    }
}

/// Alpha-composite `top` over the opaque `base` at the origin, cropping to `base`.
fn flatten_onto(base: &mut RgbImage, top: &RgbaImage) {
    let w = base.width().min(top.width());
    let h = base.height().min(top.height());
    for y in 0..h {
        for x in 0..w {
            let [r, g, b, a] = top.get_pixel(x, y).0;
            let a = u32::from(a);
            let mix = |fg: u8, back: u8| {
                ((u32::from(fg) * a + u32::from(back) * (255 - a) + 127) / 255) as u8
            };
            let px = base.get_pixel_mut(x, y);
            px.0 = [mix(r, px.0[0]), mix(g, px.0[1]), mix(b, px.0[2])];
        }
    }
}
