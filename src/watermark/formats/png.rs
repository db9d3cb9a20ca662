use image::{
    DynamicImage,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};
use std::io::BufWriter;
use std::path::Path;

use crate::watermark::WatermarkError;

/// Save image as PNG with adaptive filtering.
pub fn save(image: &DynamicImage, path: &Path) -> Result<(), WatermarkError> {
    let output = BufWriter::new(std::fs::File::create(path)?);
    let encoder =
        PngEncoder::new_with_quality(output, CompressionType::Default, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(())
}
