#![allow(dead_code)]

use std::cell::Cell;
use std::path::{Path, PathBuf};

use canvas_pdf::{
    Artifact, ArtifactSink, CaptureError, CaptureOptions, EmissionError, RasterImage, Rasterizer,
};
use chrono::NaiveDate;

pub const EPS: f64 = 1e-3;

/// Route `log` output through the test harness; `RUST_LOG=debug` shows it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn export_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

/// Stand-in capture that returns a solid raster of fixed pixel dimensions.
pub struct FixedRasterizer {
    pub width: u32,
    pub height: u32,
    pub calls: Cell<usize>,
}

impl FixedRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Cell::new(0),
        }
    }
}

impl Rasterizer for FixedRasterizer {
    type Region = ();

    fn capture_region(&self, _: &(), options: &CaptureOptions) -> Result<RasterImage, CaptureError> {
        self.calls.set(self.calls.get() + 1);
        Ok(RasterImage::filled(self.width, self.height, options.background))
    }
}

/// Capture of a view that is no longer mounted.
pub struct UnmountedRasterizer;

impl Rasterizer for UnmountedRasterizer {
    type Region = ();

    fn capture_region(&self, _: &(), _: &CaptureOptions) -> Result<RasterImage, CaptureError> {
        Err(CaptureError::RegionUnavailable(PathBuf::from("#document-canvas")))
    }
}

/// Sink whose save step is always refused.
pub struct RefusingSink {
    pub attempts: usize,
}

impl ArtifactSink for RefusingSink {
    fn save(&mut self, _: &Artifact) -> Result<PathBuf, EmissionError> {
        self.attempts += 1;
        Err(EmissionError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "download denied",
        )))
    }
}

/// Sink that keeps artifacts in memory.
#[derive(Default)]
pub struct MemorySink {
    pub saved: Vec<Artifact>,
}

impl ArtifactSink for MemorySink {
    fn save(&mut self, artifact: &Artifact) -> Result<PathBuf, EmissionError> {
        self.saved.push(artifact.clone());
        Ok(PathBuf::from(&artifact.filename))
    }
}

pub fn pdf_page_count(bytes: &[u8]) -> usize {
    let doc = lopdf::Document::load_mem(bytes).expect("parse generated PDF");
    doc.get_pages().len()
}

/// (width, height) of the first page's media box, in points.
pub fn pdf_first_mediabox(bytes: &[u8]) -> (f32, f32) {
    let doc = lopdf::Document::load_mem(bytes).expect("parse generated PDF");
    let (_, page_id) = doc.get_pages().into_iter().next().expect("at least one page");
    let page = doc.get_dictionary(page_id).expect("page dictionary");
    let nums: Vec<f32> = page
        .get(b"MediaBox")
        .and_then(|o| o.as_array())
        .expect("media box")
        .iter()
        .map(|o| o.as_float().expect("numeric media box entry"))
        .collect();
    (nums[2] - nums[0], nums[3] - nums[1])
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Write a PNG snapshot with an opaque top half and a transparent bottom half.
pub fn write_snapshot(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    let img = image::RgbaImage::from_fn(width, height, |_, y| {
        if y < height / 2 {
            image::Rgba([color[0], color[1], color[2], 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    img.save(path).expect("write snapshot");
}
