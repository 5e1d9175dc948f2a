pub mod paginate;
mod xobject;

use chrono::{Datelike, NaiveDate};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::capture::RasterImage;
use crate::error::ExportError;
use crate::model::{ImageEncoding, PageGeometry, mm_to_pt};

use paginate::{PagePlan, PageSlice};
use xobject::embed_raster;

const RASTER_NAME: &[u8] = b"Im1";
const PRODUCER: &str = concat!("canvas-pdf ", env!("CARGO_PKG_VERSION"));

/// Document-level metadata written to the PDF info dictionary.
#[derive(Clone, Copy, Debug)]
pub struct PdfMetadata<'a> {
    pub title: &'a str,
    pub date: NaiveDate,
}

/// Geometry of one page in PDF user space (points, origin bottom-left).
struct PagePlacement {
    margin: f32,
    content_top: f32,
    image_width: f32,
    image_height: f32,
}

impl PagePlacement {
    fn new(geometry: &PageGeometry, plan: &PagePlan) -> Self {
        let margin = mm_to_pt(geometry.margin());
        Self {
            margin,
            content_top: mm_to_pt(geometry.page_height()) - margin,
            image_width: mm_to_pt(plan.image.width),
            image_height: mm_to_pt(plan.image.height),
        }
    }

    /// Clip to this slice's box below the top margin and draw the whole image
    /// shifted up by the slice offset, so only the slice is visible.
    fn draw_slice(&self, content: &mut Content, slice: &PageSlice) {
        let draw_h = mm_to_pt(slice.draw_height);
        let offset = mm_to_pt(slice.offset);

        content.save_state();
        content
            .rect(self.margin, self.content_top - draw_h, self.image_width, draw_h)
            .clip_nonzero()
            .end_path();
        content.transform([
            self.image_width,
            0.0,
            0.0,
            self.image_height,
            self.margin,
            self.content_top + offset - self.image_height,
        ]);
        content.x_object(Name(RASTER_NAME));
        content.restore_state();
    }
}

/// Assemble a paginated PDF showing `raster` laid out by `plan`.
pub fn render(
    raster: &RasterImage,
    plan: &PagePlan,
    geometry: &PageGeometry,
    encoding: ImageEncoding,
    meta: &PdfMetadata,
) -> Result<Vec<u8>, ExportError> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let image_id = alloc();

    let image_bytes = embed_raster(&mut pdf, image_id, raster, encoding)?;
    let t_image = t0.elapsed();

    let n = plan.page_count();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    let placement = PagePlacement::new(geometry, plan);
    for (i, slice) in plan.slices.iter().enumerate() {
        let mut content = Content::new();
        placement.draw_slice(&mut content, slice);
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        log::debug!(
            "Page {}: offset={:.2}mm height={:.2}mm",
            i + 1,
            slice.offset,
            slice.draw_height
        );
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let media_box = Rect::new(
        0.0,
        0.0,
        mm_to_pt(geometry.page_width()),
        mm_to_pt(geometry.page_height()),
    );
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(media_box)
            .parent(pages_id)
            .contents(content_ids[i]);
        page.resources()
            .x_objects()
            .pair(Name(RASTER_NAME), image_id);
    }

    pdf.document_info(info_id)
        .title(TextStr(meta.title))
        .producer(TextStr(PRODUCER))
        .creation_date(
            Date::new(meta.date.year().clamp(0, 9999) as u16)
                .month(meta.date.month() as u8)
                .day(meta.date.day() as u8),
        );

    let bytes = pdf.finish();

    log::info!(
        "Render phases: image={:.1}ms ({} bytes, {:?}), pages={:.1}ms ({} pages), total {} bytes",
        t_image.as_secs_f64() * 1000.0,
        image_bytes,
        encoding,
        (t0.elapsed() - t_image).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );

    Ok(bytes)
}
