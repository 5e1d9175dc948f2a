mod capture;
mod document;
mod error;
mod export;
mod model;
mod pdf;

pub use capture::{
    CaptureOptions, MAX_RASTER_PIXELS, MAX_RASTER_SIDE, RasterImage, Rasterizer, SnapshotRasterizer,
};
pub use document::{DocumentRepository, XmlDocumentStore, load_record, parse_record, serialize_record};
pub use error::{CaptureError, EmissionError, Error, ExportError};
pub use export::{
    ArtifactSink, DirectorySink, ExportController, ExportNotice, ExportSettings, NoticeKind,
    PdfExport, RETRY_MESSAGE, export_filename, pdf_artifact, sanitize_title, text_artifact,
};
pub use model::{
    Artifact, DocumentRecord, FALLBACK_TITLE, FitMode, ImageEncoding, MIME_PDF, MIME_TEXT, Orientation,
    PageFormat, PageGeometry, mm_to_pt, parse_hex_color,
};
pub use pdf::paginate::{PagePlan, PageSlice, SLICE_EPSILON, ScaledImage, paginate, slice_heights};
pub use pdf::{PdfMetadata, render};

use std::path::Path;

use chrono::NaiveDate;

/// Export a snapshot of a document view to `{title}_{date}.pdf` under `out_dir`.
pub fn export_snapshot_to_pdf(
    snapshot: &Path,
    record: &DocumentRecord,
    settings: &ExportSettings,
    date: NaiveDate,
    out_dir: &Path,
) -> Result<std::path::PathBuf, Error> {
    let export = pdf_artifact(&SnapshotRasterizer, snapshot, &record.title, settings, date)?;
    let path = DirectorySink::new(out_dir)
        .save(&export.artifact)
        .map_err(ExportError::from)?;
    Ok(path)
}
