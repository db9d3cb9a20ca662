use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use crate::watermark::WatermarkError;

/// Save image as lossy WebP, keeping alpha when the image has it.
pub fn save(image: &DynamicImage, path: &Path, quality: f32) -> Result<(), WatermarkError> {
    let (width, height) = (image.width(), image.height());
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode(quality)
    };

    if encoded.is_empty() {
        return Err(WatermarkError::WebPError(format!(
            "encoder produced no data for {}x{} image",
            width, height
        )));
    }

    std::fs::write(path, &*encoded)?;
    debug!("WebP written: {} bytes", encoded.len());
    Ok(())
}
