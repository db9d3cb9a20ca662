use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use crate::watermark::WatermarkError;

/// Save image as JPEG, embedding the source's ICC profile when there is one.
pub fn save_with_profile(
    image: &DynamicImage,
    path: &Path,
    quality: u8,
    icc_profile: Option<&[u8]>,
) -> Result<(), WatermarkError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let output = BufWriter::new(std::fs::File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(output, quality);

    if let Some(profile_data) = icc_profile {
        match encoder.set_icc_profile(profile_data.to_vec()) {
            Ok(()) => debug!("Embedding ICC profile: {} bytes", profile_data.len()),
            Err(e) => debug!("JPEG encoder rejected ICC profile ({}), writing without", e),
        }
    }

    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}
