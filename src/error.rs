use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-level errors outside the export pipeline (document store, file I/O).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Rasterization of the document region failed or the region was unavailable.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("region unavailable: {}", .0.display())]
    RegionUnavailable(PathBuf),

    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("invalid capture options: {0}")]
    InvalidOptions(String),
}

/// Assembling the artifact or triggering the save failed.
#[derive(Error, Debug)]
pub enum EmissionError {
    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("save failed: {0}")]
    Io(#[from] io::Error),

    #[error("file name is not a single path component: {0:?}")]
    InvalidFilename(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Page geometry leaves no content area. A configuration defect, never retried.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error("an export is already in progress")]
    Busy,
}

impl ExportError {
    /// Whether the user can reasonably retry the export.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, ExportError::InvalidGeometry(_))
    }
}
