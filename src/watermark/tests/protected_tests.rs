use crate::attribution::AttributionEntry;
use crate::fonts::FontResolver;
use crate::watermark::{ImageSize, OutputMode, WatermarkProcessor, WatermarkRequest};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

fn processor() -> WatermarkProcessor {
    WatermarkProcessor::default().with_font_resolver(FontResolver::bitmap_only())
}

fn protected_request(dir: &Path, text: &str) -> WatermarkRequest {
    WatermarkRequest {
        source_path: dir.join("in.png"),
        destination_path: dir.join("out.png"),
        watermark_text: text.to_string(),
        log_path: dir.join("log.csv"),
        photographer: None,
        subfolder: None,
        mode: OutputMode::Protected,
    }
}

fn region_alpha(image: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> (usize, u8) {
    let mut count = 0;
    let mut max = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            let alpha = image.get_pixel(x, y)[3];
            if alpha > 0 {
                count += 1;
                max = max.max(alpha);
            }
        }
    }
    (count, max)
}

#[test]
fn test_pattern_reaches_every_quadrant() {
    let temp_dir = TempDir::new().unwrap();
    let overlay = processor().render_overlay(
        ImageSize::new(800, 600),
        &protected_request(temp_dir.path(), "Contest 2024"),
        &AttributionEntry::default(),
        "",
    );

    for (x0, y0) in [(0, 0), (400, 0), (0, 300), (400, 300)] {
        let (count, _) = region_alpha(&overlay, x0, y0, x0 + 400, y0 + 300);
        assert!(count > 0, "quadrant at ({}, {}) has no pattern", x0, y0);
    }
}

#[test]
fn test_pattern_is_faint() {
    let temp_dir = TempDir::new().unwrap();
    let overlay = processor().render_overlay(
        ImageSize::new(800, 600),
        &protected_request(temp_dir.path(), "Contest 2024"),
        &AttributionEntry::default(),
        "",
    );

    // top-left holds nothing but pattern text
    let (count, max) = region_alpha(&overlay, 0, 0, 300, 200);
    assert!(count > 0);
    assert!(max < 128, "pattern alpha too strong: {}", max);
}

#[test]
fn test_normal_mode_has_no_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let mut request = protected_request(temp_dir.path(), "Contest 2024");
    request.mode = OutputMode::Normal;
    let overlay = processor().render_overlay(
        ImageSize::new(800, 600),
        &request,
        &AttributionEntry::default(),
        "",
    );

    assert_eq!(region_alpha(&overlay, 0, 0, 400, 300).0, 0);
}

#[test]
fn test_empty_text_skips_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let overlay = processor().render_overlay(
        ImageSize::new(800, 600),
        &protected_request(temp_dir.path(), ""),
        &AttributionEntry::default(),
        "",
    );

    assert_eq!(region_alpha(&overlay, 0, 0, 800, 600).0, 0);
}

#[test]
fn test_logo_drawn_over_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let logo_path = temp_dir.path().join("logo.png");
    RgbaImage::from_pixel(80, 80, Rgba([255, 0, 0, 255]))
        .save(&logo_path)
        .unwrap();

    let mut processor = processor();
    assert!(processor.load_logo(&logo_path));

    let overlay = processor.render_overlay(
        ImageSize::new(800, 600),
        &protected_request(temp_dir.path(), "Contest 2024"),
        &AttributionEntry::default(),
        "",
    );

    // 36x36 protected logo at (15, 549)
    let inside = overlay.get_pixel(33, 567);
    assert!(inside[0] >= 250 && inside[1] < 10 && inside[3] >= 250, "{:?}", inside);
    // a normal-size logo would reach this far
    let outside = overlay.get_pixel(60, 540);
    assert!(outside[3] < 250, "{:?}", outside);
}

#[test]
fn test_protected_output_logged_as_protected() {
    let temp_dir = TempDir::new().unwrap();
    let request = protected_request(temp_dir.path(), "Contest 2024");
    RgbImage::from_pixel(500, 400, Rgb([90, 90, 90]))
        .save(&request.source_path)
        .unwrap();

    let outcome = processor().try_add_watermark(&request).unwrap();
    assert_eq!(outcome.final_size, ImageSize::new(500, 400));

    let written = image::open(&request.destination_path).unwrap().to_rgb8();
    let changed = written.pixels().filter(|p| p.0 != [90, 90, 90]).count();
    assert!(changed > 1000);

    let log = std::fs::read_to_string(&request.log_path).unwrap();
    assert!(log.lines().nth(1).unwrap().contains(",protected,500x400,500x400,false"));
}
