use image::codecs::jpeg::JpegEncoder;
use pdf_writer::{Filter, Pdf, Ref};

use crate::capture::RasterImage;
use crate::error::EmissionError;
use crate::model::ImageEncoding;

/// Write `raster` as an RGB image XObject at `xobj_ref`.
pub(super) fn embed_raster(
    pdf: &mut Pdf,
    xobj_ref: Ref,
    raster: &RasterImage,
    encoding: ImageEncoding,
) -> Result<usize, EmissionError> {
    let side = |px: u32| {
        i32::try_from(px)
            .map_err(|_| EmissionError::Encode(format!("raster side {px} exceeds PDF limits")))
    };
    let (w, h) = (side(raster.width())?, side(raster.height())?);

    let (data, filter) = match encoding {
        ImageEncoding::Flate => {
            let compressed =
                miniz_oxide::deflate::compress_to_vec_zlib(raster.pixels().as_raw(), 6);
            (compressed, Filter::FlateDecode)
        }
        ImageEncoding::Jpeg { quality } => {
            let mut buf = Vec::new();
            JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
                .encode_image(raster.pixels())
                .map_err(|e| EmissionError::Encode(format!("JPEG: {e}")))?;
            (buf, Filter::DctDecode)
        }
    };

    let mut xobj = pdf.image_xobject(xobj_ref, &data);
    xobj.filter(filter);
    xobj.width(w);
    xobj.height(h);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);

    Ok(data.len())
}
