use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDate};

use crate::capture::{CaptureOptions, Rasterizer};
use crate::document::write_atomically;
use crate::error::{EmissionError, ExportError};
use crate::model::{
    Artifact, DocumentRecord, FALLBACK_TITLE, ImageEncoding, MIME_PDF, MIME_TEXT, PageGeometry,
};
use crate::pdf::{self, PdfMetadata, paginate};

pub const RETRY_MESSAGE: &str = "Export failed. Please try again.";

/// Everything that shapes a binary export.
#[derive(Clone, Debug, Default)]
pub struct ExportSettings {
    pub geometry: PageGeometry,
    pub capture: CaptureOptions,
    pub encoding: ImageEncoding,
}

/// `{title}_{YYYY-MM-DD}.{ext}`, with `document` standing in for an empty title.
pub fn export_filename(title: &str, date: NaiveDate, ext: &str) -> String {
    let title = title.trim();
    let stem = if title.is_empty() { FALLBACK_TITLE } else { title };
    format!("{stem}_{}.{ext}", date.format("%Y-%m-%d"))
}

/// Make a display title safe to use as a file name stem.
///
/// Drops path separators, characters reserved on common file systems and
/// control characters, collapses whitespace and strips leading dots.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = cleaned
        .split_whitespace()
        .filter(|word| !word.chars().all(|c| c == '.'))
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.trim_start_matches('.').trim().to_string()
}

/// Plain-text export: `{title}\n\n{body}`. Never rasterizes.
pub fn text_artifact(record: &DocumentRecord, date: NaiveDate) -> Artifact {
    Artifact {
        filename: export_filename(&record.title, date, "txt"),
        mime: MIME_TEXT,
        bytes: format!("{}\n\n{}", record.title, record.body).into_bytes(),
    }
}

/// A rendered PDF and the number of pages in it.
#[derive(Clone, Debug)]
pub struct PdfExport {
    pub artifact: Artifact,
    pub pages: usize,
}

/// Capture `region`, paginate it and assemble the PDF. Nothing is saved.
pub fn pdf_artifact<R: Rasterizer + ?Sized>(
    rasterizer: &R,
    region: &R::Region,
    title: &str,
    settings: &ExportSettings,
    date: NaiveDate,
) -> Result<PdfExport, ExportError> {
    let t0 = Instant::now();

    let raster = rasterizer.capture_region(region, &settings.capture)?;
    let t_capture = t0.elapsed();

    let plan = paginate::paginate(raster.width(), raster.height(), &settings.geometry)?;
    let t_paginate = t0.elapsed();

    let title = title.trim();
    let meta = PdfMetadata {
        title: if title.is_empty() { FALLBACK_TITLE } else { title },
        date,
    };
    let bytes = pdf::render(&raster, &plan, &settings.geometry, settings.encoding, &meta)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: capture={:.1}ms, paginate={:.1}ms, render={:.1}ms, total={:.1}ms ({}x{}px -> {} pages, ratio {:.4})",
        t_capture.as_secs_f64() * 1000.0,
        (t_paginate - t_capture).as_secs_f64() * 1000.0,
        (t_total - t_paginate).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        raster.width(),
        raster.height(),
        plan.page_count(),
        plan.image.ratio,
    );

    Ok(PdfExport {
        artifact: Artifact {
            filename: export_filename(title, date, "pdf"),
            mime: MIME_PDF,
            bytes,
        },
        pages: plan.page_count(),
    })
}

/// The client-side save step.
pub trait ArtifactSink {
    /// Persist the whole artifact or nothing, returning where it landed.
    fn save(&mut self, artifact: &Artifact) -> Result<PathBuf, EmissionError>;
}

/// Saves artifacts into a directory, writing through a temporary `.part` file.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&mut self, artifact: &Artifact) -> Result<PathBuf, EmissionError> {
        // Exactly one normal component, so the join cannot leave `dir`.
        let name = Path::new(&artifact.filename);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(EmissionError::InvalidFilename(artifact.filename.clone()));
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        write_atomically(&path, &artifact.bytes)?;
        Ok(path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// The user can try again.
    Retry,
    /// Configuration defect; retrying will not help.
    Fatal,
}

/// What the user is told once an export finishes.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportNotice {
    Saved {
        path: PathBuf,
        filename: String,
        /// `None` for text exports.
        pages: Option<usize>,
    },
    Failed {
        kind: NoticeKind,
        message: String,
        detail: String,
    },
}

impl ExportNotice {
    pub fn is_saved(&self) -> bool {
        matches!(self, ExportNotice::Saved { .. })
    }

    fn from_error(err: &ExportError) -> Self {
        let (kind, message) = match err {
            ExportError::InvalidGeometry(_) => (
                NoticeKind::Fatal,
                "Export is misconfigured and cannot run.".to_string(),
            ),
            ExportError::Busy => (
                NoticeKind::Retry,
                "An export is already running.".to_string(),
            ),
            ExportError::Capture(_) | ExportError::Emission(_) => {
                (NoticeKind::Retry, RETRY_MESSAGE.to_string())
            }
        };
        ExportNotice::Failed {
            kind,
            message,
            detail: err.to_string(),
        }
    }
}

/// Holds the in-progress flag for one export; clears it on every exit path.
struct ExportGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Export trigger for one document view.
///
/// Only one binary export runs at a time; a trigger while one is running is
/// rejected with [`ExportError::Busy`]. Text export bypasses the capture path
/// and is never blocked by it.
pub struct ExportController {
    settings: ExportSettings,
    in_progress: Cell<bool>,
    today: fn() -> NaiveDate,
    file_stem: fn(&str) -> String,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn title_as_stem(title: &str) -> String {
    title.to_string()
}

impl ExportController {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            in_progress: Cell::new(false),
            today: local_today,
            file_stem: title_as_stem,
        }
    }

    /// Replace the clock used to date export file names.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Map the document title to the file name stem, e.g. [`sanitize_title`].
    ///
    /// Only the file name is affected; the text content and the PDF title
    /// keep the title as stored.
    pub fn with_file_stem(mut self, file_stem: fn(&str) -> String) -> Self {
        self.file_stem = file_stem;
        self
    }

    fn filename(&self, title: &str, date: NaiveDate, ext: &str) -> String {
        export_filename(&(self.file_stem)(title), date, ext)
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// True while a binary export is running; the trigger should be disabled.
    pub fn is_exporting(&self) -> bool {
        self.in_progress.get()
    }

    fn begin(&self) -> Result<ExportGuard<'_>, ExportError> {
        if self.in_progress.replace(true) {
            return Err(ExportError::Busy);
        }
        Ok(ExportGuard {
            flag: &self.in_progress,
        })
    }

    /// Capture, paginate, render and save. Errors are returned as-is.
    pub fn try_export_pdf<R: Rasterizer + ?Sized>(
        &self,
        rasterizer: &R,
        region: &R::Region,
        record: &DocumentRecord,
        sink: &mut dyn ArtifactSink,
    ) -> Result<ExportNotice, ExportError> {
        let _guard = self.begin()?;
        let today = (self.today)();
        let mut export = pdf_artifact(rasterizer, region, &record.title, &self.settings, today)?;
        export.artifact.filename = self.filename(&record.title, today, "pdf");
        let path = sink.save(&export.artifact)?;
        log::info!("Saved {} ({} pages)", path.display(), export.pages);
        Ok(ExportNotice::Saved {
            path,
            filename: export.artifact.filename,
            pages: Some(export.pages),
        })
    }

    /// Binary export with every failure converted into a user-facing notice.
    pub fn export_pdf<R: Rasterizer + ?Sized>(
        &self,
        rasterizer: &R,
        region: &R::Region,
        record: &DocumentRecord,
        sink: &mut dyn ArtifactSink,
    ) -> ExportNotice {
        self.try_export_pdf(rasterizer, region, record, sink)
            .unwrap_or_else(|e| {
                log::warn!("PDF export failed: {e}");
                ExportNotice::from_error(&e)
            })
    }

    pub fn try_export_text(
        &self,
        record: &DocumentRecord,
        sink: &mut dyn ArtifactSink,
    ) -> Result<ExportNotice, ExportError> {
        let today = (self.today)();
        let mut artifact = text_artifact(record, today);
        artifact.filename = self.filename(&record.title, today, "txt");
        let path = sink.save(&artifact)?;
        log::info!("Saved {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(ExportNotice::Saved {
            path,
            filename: artifact.filename,
            pages: None,
        })
    }

    pub fn export_text(&self, record: &DocumentRecord, sink: &mut dyn ArtifactSink) -> ExportNotice {
        self.try_export_text(record, sink).unwrap_or_else(|e| {
            log::warn!("Text export failed: {e}");
            ExportNotice::from_error(&e)
        })
    }
}
