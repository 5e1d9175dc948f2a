use std::str::FromStr;

use crate::error::ExportError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Title token used when a document has no title.
pub const FALLBACK_TITLE: &str = "document";

const MM_PER_INCH: f64 = 25.4;

/// Millimetres to PDF user-space points.
pub fn mm_to_pt(mm: f64) -> f32 {
    (mm * 72.0 / MM_PER_INCH) as f32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageFormat {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    /// Portrait (width, height) in millimetres.
    pub fn size_mm(self) -> (f64, f64) {
        match self {
            PageFormat::A3 => (297.0, 420.0),
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
            PageFormat::Legal => (215.9, 355.6),
        }
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a3" => Ok(PageFormat::A3),
            "a4" => Ok(PageFormat::A4),
            "a5" => Ok(PageFormat::A5),
            "letter" => Ok(PageFormat::Letter),
            "legal" => Ok(PageFormat::Legal),
            other => Err(format!("unknown page format '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// How the captured raster is scaled into the content box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitMode {
    /// Fill the content width; tall content continues onto further pages.
    #[default]
    Width,
    /// Fit both axes (`min` of the two ratios); content always fits one page.
    Page,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "width" => Ok(FitMode::Width),
            "page" => Ok(FitMode::Page),
            other => Err(format!("unknown fit mode '{other}'")),
        }
    }
}

/// Physical page size and uniform margin, all in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    page_width: f64,
    page_height: f64,
    margin: f64,
    fit: FitMode,
}

impl PageGeometry {
    pub fn new(page_width: f64, page_height: f64, margin: f64) -> Result<Self, ExportError> {
        if !(page_width.is_finite() && page_height.is_finite() && margin.is_finite()) {
            return Err(ExportError::InvalidGeometry(
                "page dimensions must be finite".into(),
            ));
        }
        if page_width <= 0.0 || page_height <= 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "page size {page_width}x{page_height}mm is not positive"
            )));
        }
        if margin < 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "margin {margin}mm is negative"
            )));
        }
        if margin * 2.0 >= page_width || margin * 2.0 >= page_height {
            return Err(ExportError::InvalidGeometry(format!(
                "margin {margin}mm leaves no content area on a {page_width}x{page_height}mm page"
            )));
        }
        Ok(Self {
            page_width,
            page_height,
            margin,
            fit: FitMode::default(),
        })
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }

    pub fn for_format(
        format: PageFormat,
        orientation: Orientation,
        margin: f64,
    ) -> Result<Self, ExportError> {
        let (w, h) = format.size_mm();
        match orientation {
            Orientation::Portrait => Self::new(w, h, margin),
            Orientation::Landscape => Self::new(h, w, margin),
        }
    }

    pub fn page_width(&self) -> f64 {
        self.page_width
    }

    pub fn page_height(&self) -> f64 {
        self.page_height
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn fit(&self) -> FitMode {
        self.fit
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f64 {
        self.page_height - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    /// A4 portrait with a one inch margin.
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: MM_PER_INCH,
            fit: FitMode::Width,
        }
    }
}

/// How the captured raster is stored inside the PDF.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Lossless RGB, zlib-compressed.
    #[default]
    Flate,
    Jpeg { quality: u8 },
}

/// The collaborator's view of a document: what is displayed and exported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentRecord {
    pub title: String,
    pub body: String,
    pub status: String,
}

impl DocumentRecord {
    pub fn new(title: impl Into<String>, body: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            status: status.into(),
        }
    }
}

/// A finished export, ready to be handed to a sink.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

pub fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    let val = val.strip_prefix('#').unwrap_or(val);
    if val.len() != 6 || !val.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}
