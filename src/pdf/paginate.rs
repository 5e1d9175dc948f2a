use crate::error::ExportError;
use crate::model::{FitMode, PageGeometry};

/// Remaining heights at or below this (mm) count as fully placed.
pub const SLICE_EPSILON: f64 = 1e-4;

/// The captured raster scaled to fit the content box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledImage {
    pub ratio: f64,
    pub width: f64,
    pub height: f64,
}

/// One physical page's share of the scaled image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSlice {
    /// Distance from the top of the scaled image to the top of this slice (mm).
    pub offset: f64,
    pub draw_height: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagePlan {
    pub image: ScaledImage,
    pub slices: Vec<PageSlice>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.slices.len()
    }

    pub fn total_height(&self) -> f64 {
        self.slices.iter().map(|s| s.draw_height).sum()
    }
}

pub fn scale_to_content(
    source_width: u32,
    source_height: u32,
    geometry: &PageGeometry,
) -> Result<ScaledImage, ExportError> {
    if source_width == 0 || source_height == 0 {
        return Err(ExportError::InvalidGeometry(format!(
            "source region {source_width}x{source_height}px has no area"
        )));
    }
    let content_w = geometry.content_width();
    let content_h = geometry.content_height();
    if content_w <= 0.0 || content_h <= 0.0 {
        return Err(ExportError::InvalidGeometry(format!(
            "content area {content_w}x{content_h}mm is not positive"
        )));
    }

    let (sw, sh) = (f64::from(source_width), f64::from(source_height));
    let ratio = match geometry.fit() {
        FitMode::Width => content_w / sw,
        FitMode::Page => (content_w / sw).min(content_h / sh),
    };
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ExportError::InvalidGeometry(format!(
            "scale ratio {ratio} for {source_width}x{source_height}px"
        )));
    }

    Ok(ScaledImage {
        ratio,
        width: sw * ratio,
        height: sh * ratio,
    })
}

/// Split a `source_width` x `source_height` raster into page slices.
///
/// Pure: identical inputs always give an identical plan.
pub fn paginate(
    source_width: u32,
    source_height: u32,
    geometry: &PageGeometry,
) -> Result<PagePlan, ExportError> {
    let image = scale_to_content(source_width, source_height, geometry)?;
    let slices = slice_heights(image.height, geometry.content_height())?;
    Ok(PagePlan { image, slices })
}

/// Slice `scaled_height` into pages of at most `content_height`.
pub fn slice_heights(
    scaled_height: f64,
    content_height: f64,
) -> Result<Vec<PageSlice>, ExportError> {
    if content_height.is_nan() || content_height <= 0.0 {
        return Err(ExportError::InvalidGeometry(format!(
            "content height {content_height}mm is not positive"
        )));
    }
    // Degenerate capture still produces one (empty) page.
    if scaled_height.is_nan() || scaled_height <= SLICE_EPSILON {
        return Ok(vec![PageSlice {
            offset: 0.0,
            draw_height: scaled_height.max(0.0),
        }]);
    }

    let mut slices = Vec::with_capacity((scaled_height / content_height).ceil() as usize);
    let mut remaining = scaled_height;
    let mut offset = 0.0f64;
    while remaining > SLICE_EPSILON {
        // The last page takes everything left so float drift never spills a
        // sliver onto an extra page.
        let draw_height = if remaining <= content_height + SLICE_EPSILON {
            remaining
        } else {
            content_height
        };
        slices.push(PageSlice {
            offset,
            draw_height,
        });
        remaining -= draw_height;
        offset += draw_height;
    }
    Ok(slices)
}
