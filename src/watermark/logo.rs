use super::types::{ImageSize, OutputMode};
use image::{RgbaImage, imageops::FilterType};
use std::path::Path;
use tracing::{debug, warn};

/// Holds the optional logo and produces per-image scaled copies of it.
#[derive(Debug, Default, Clone)]
pub struct LogoPreparer {
    logo: Option<RgbaImage>,
}

impl LogoPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and normalize the logo. On failure the previously loaded logo, if
    /// any, stays in place.
    pub fn load(&mut self, path: &Path) -> bool {
        match image::open(path) {
            Ok(img) => {
                let logo = img.to_rgba8();
                debug!(
                    "Loaded logo {:?} ({}x{})",
                    path,
                    logo.width(),
                    logo.height()
                );
                self.logo = Some(logo);
                true
            }
            Err(e) => {
                warn!("Failed to load logo {:?}: {}", path, e);
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.logo.is_some()
    }

    /// A fresh copy of the logo sized for an image of `target` in `mode`, or
    /// `None` when no logo is loaded.
    pub fn scaled_for(&self, target: ImageSize, mode: OutputMode) -> Option<RgbaImage> {
        let logo = self.logo.as_ref()?;
        let source = ImageSize::new(logo.width(), logo.height());
        let size = scaled_logo_size(source, target, mode);
        Some(image::imageops::resize(
            logo,
            size.width,
            size.height,
            FilterType::Lanczos3,
        ))
    }
}

/// Fit the logo into `mode.logo_ratio()` of the target on both axes, then pull
/// its longer edge into the mode's pixel bounds. Aspect ratio is kept.
pub fn scaled_logo_size(logo: ImageSize, target: ImageSize, mode: OutputMode) -> ImageSize {
    let logo_w = logo.width.max(1) as f32;
    let logo_h = logo.height.max(1) as f32;
    let ratio = mode.logo_ratio();

    let max_w = target.width as f32 * ratio;
    let max_h = target.height as f32 * ratio;
    let mut scale = (max_w / logo_w).min(max_h / logo_h);

    let longest = logo_w.max(logo_h) * scale;
    let min_px = mode.logo_min_px() as f32;
    let max_px = mode.logo_max_px() as f32;
    if longest > max_px {
        scale = max_px / logo_w.max(logo_h);
    } else if longest < min_px {
        scale = min_px / logo_w.max(logo_h);
    }

    ImageSize::new(
        ((logo_w * scale).round() as u32).max(1),
        ((logo_h * scale).round() as u32).max(1),
    )
}

/// Copy of `logo` with every pixel's alpha multiplied by `factor`.
pub fn faded(logo: &RgbaImage, factor: f32) -> RgbaImage {
    let factor = factor.clamp(0.0, 1.0);
    let mut out = logo.clone();
    for pixel in out.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor).round() as u8;
    }
    out
}
