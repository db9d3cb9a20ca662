pub mod jpeg;
pub mod png;
pub mod webp;

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use std::path::Path;
use tracing::debug;

use super::WatermarkError;
use super::types::OutputFormat;

/// Encoder knobs. None of these change what the output looks like beyond
/// compression artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub jpeg_quality: u8,
    pub webp_quality: f32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            webp_quality: 85.0,
        }
    }
}

/// Convert the composited image into what `format` can store: alpha-capable
/// formats keep RGBA, the rest are flattened onto opaque white.
pub fn adapt_for_format(image: RgbaImage, format: OutputFormat) -> DynamicImage {
    if format.keeps_alpha() {
        DynamicImage::ImageRgba8(image)
    } else {
        DynamicImage::ImageRgb8(flatten_onto_white(&image))
    }
}

/// Blend every pixel onto white using its own alpha as the mask.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    let mut flat = RgbImage::from_pixel(image.width(), image.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        flat.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flat
}

/// Encode `image` to `path` in `format`.
pub fn save(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    settings: &EncodeSettings,
    icc_profile: Option<&[u8]>,
) -> Result<(), WatermarkError> {
    debug!("Saving {:?} as {:?}", path, format);
    match format {
        OutputFormat::Jpeg => {
            jpeg::save_with_profile(image, path, settings.jpeg_quality, icc_profile)
        }
        OutputFormat::Png => png::save(image, path),
        OutputFormat::WebP => webp::save(image, path, settings.webp_quality),
        OutputFormat::Tiff | OutputFormat::Bmp | OutputFormat::Gif => {
            image.save_with_format(path, format.image_format())?;
            Ok(())
        }
    }
}
