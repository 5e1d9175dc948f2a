mod common;

use std::path::Path;

use canvas_pdf::{
    CaptureError, CaptureOptions, DocumentRecord, ExportSettings, MAX_RASTER_PIXELS, Rasterizer,
    SnapshotRasterizer, export_snapshot_to_pdf,
};
use common::{export_date, file_names, pdf_page_count, write_snapshot};

/// Resampling may be off by one per channel.
fn assert_close(actual: [u8; 3], expected: [u8; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn missing_snapshot_is_region_unavailable() {
    let err = SnapshotRasterizer
        .capture_region(Path::new("does/not/exist.png"), &CaptureOptions::default())
        .unwrap_err();
    assert!(matches!(err, CaptureError::RegionUnavailable(_)));
}

#[test]
fn undecodable_snapshot_is_a_rasterize_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    std::fs::write(&path, b"definitely not an image").unwrap();

    let err = SnapshotRasterizer
        .capture_region(&path, &CaptureOptions::default())
        .unwrap_err();
    assert!(matches!(err, CaptureError::Rasterize(_)), "{err}");
}

#[test]
fn capture_scales_and_flattens_onto_background() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    write_snapshot(&path, 40, 20, [200, 0, 0]);
    let before = std::fs::read(&path).unwrap();

    let options = CaptureOptions {
        scale: 2.0,
        background: [0, 0, 255],
        width_hint: None,
        height_hint: None,
    };
    let raster = SnapshotRasterizer.capture_region(&path, &options).unwrap();
    assert_eq!((raster.width(), raster.height()), (80, 40));

    // Opaque top stays, transparent bottom shows the background.
    assert_close(raster.pixels().get_pixel(40, 5).0, [200, 0, 0]);
    assert_close(raster.pixels().get_pixel(40, 35).0, [0, 0, 255]);

    assert_eq!(std::fs::read(&path).unwrap(), before, "source must not be modified");
}

#[test]
fn size_hints_crop_and_pad_the_capture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    write_snapshot(&path, 30, 30, [0, 128, 0]);

    let options = CaptureOptions {
        scale: 1.0,
        background: [255, 255, 255],
        width_hint: Some(20),
        height_hint: Some(50),
    };
    let raster = SnapshotRasterizer.capture_region(&path, &options).unwrap();
    assert_eq!((raster.width(), raster.height()), (20, 50));
    assert_eq!(raster.pixels().get_pixel(10, 2).0, [0, 128, 0]);
    assert_eq!(raster.pixels().get_pixel(10, 45).0, [255, 255, 255]);
}

#[test]
fn scale_below_one_is_rejected() {
    let options = CaptureOptions {
        scale: 0.75,
        ..Default::default()
    };
    let err = SnapshotRasterizer
        .capture_region(Path::new("any.png"), &options)
        .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidOptions(_)));
}

#[test]
fn oversized_rasters_are_rejected_without_allocating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    write_snapshot(&path, 20, 20, [0, 0, 0]);

    let huge_scale = CaptureOptions {
        scale: 1e9,
        ..Default::default()
    };
    let huge_hint = CaptureOptions {
        scale: 1.0,
        width_hint: Some(u32::MAX),
        ..Default::default()
    };
    let over_budget = CaptureOptions {
        scale: 1.0,
        width_hint: Some(1 << 15),
        height_hint: Some(1 << 15),
        ..Default::default()
    };
    for options in [huge_scale, huge_hint, over_budget] {
        let err = SnapshotRasterizer.capture_region(&path, &options).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidOptions(_)), "{options:?}: {err}");
    }

    let unit = CaptureOptions {
        scale: 1.0,
        ..Default::default()
    };
    assert_eq!(unit.raster_size(1 << 14, 1 << 14).unwrap(), (1 << 14, 1 << 14));
    assert_eq!(u64::from(1u32 << 14).pow(2), MAX_RASTER_PIXELS);
}

#[test]
fn small_hints_bound_the_upscaled_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    write_snapshot(&path, 20, 20, [0, 128, 0]);

    let options = CaptureOptions {
        scale: 500.0,
        width_hint: Some(2),
        height_hint: Some(2),
        ..Default::default()
    };
    let raster = SnapshotRasterizer.capture_region(&path, &options).unwrap();
    assert_eq!((raster.width(), raster.height()), (1000, 1000));
    assert_close(raster.pixels().get_pixel(500, 500).0, [0, 128, 0]);
}

#[test]
fn snapshot_export_writes_a_paginated_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("canvas.png");
    write_snapshot(&snapshot, 100, 600, [30, 30, 30]);
    let out = dir.path().join("out");

    let record = DocumentRecord::new("Case Summary", "", "draft");
    let settings = ExportSettings {
        capture: CaptureOptions {
            scale: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let path = export_snapshot_to_pdf(&snapshot, &record, &settings, export_date(), &out).unwrap();

    // 100px wide -> ratio 1.592, 600px -> 955.2mm -> 4 pages of 246.2mm
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(pdf_page_count(&bytes), 4);
    assert_eq!(file_names(&out), vec!["Case Summary_2025-01-15.pdf"]);
}

#[test]
fn failed_snapshot_export_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let record = DocumentRecord::new("Case Summary", "", "draft");
    let result = export_snapshot_to_pdf(
        &dir.path().join("gone.png"),
        &record,
        &ExportSettings::default(),
        export_date(),
        &out,
    );
    assert!(result.is_err());
    assert!(file_names(&out).is_empty());
}
