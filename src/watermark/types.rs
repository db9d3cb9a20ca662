use image::ImageFormat;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which output variant a request renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Normal,
    Protected,
}

impl OutputMode {
    /// Logo size as a fraction of the target image's width and height.
    pub fn logo_ratio(&self) -> f32 {
        match self {
            OutputMode::Normal => 0.09,
            OutputMode::Protected => 0.06,
        }
    }

    /// Smallest edge a scaled logo may have, in pixels.
    pub fn logo_min_px(&self) -> u32 {
        match self {
            OutputMode::Normal => 50,
            OutputMode::Protected => 30,
        }
    }

    pub fn logo_max_px(&self) -> u32 {
        200
    }

    pub fn has_diagonal_pattern(&self) -> bool {
        matches!(self, OutputMode::Protected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Normal => "normal",
            OutputMode::Protected => "protected",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded format of a destination file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
    WebP,
    Bmp,
    Gif,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "webp" => Some(OutputFormat::WebP),
            "bmp" => Some(OutputFormat::Bmp),
            "gif" => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    /// Formats written with their alpha channel intact. Everything else is
    /// flattened onto white first.
    pub fn keeps_alpha(&self) -> bool {
        matches!(
            self,
            OutputFormat::Png | OutputFormat::Tiff | OutputFormat::WebP
        )
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Gif => ImageFormat::Gif,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn exceeds(&self, bounds: ImageSize) -> bool {
        self.width > bounds.width || self.height > bounds.height
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One unit of work for the compositor.
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub watermark_text: String,
    pub log_path: PathBuf,
    pub photographer: Option<String>,
    pub subfolder: Option<String>,
    pub mode: OutputMode,
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOutcome {
    pub original_size: ImageSize,
    pub final_size: ImageSize,
    pub photographer: String,
}

impl WatermarkOutcome {
    pub fn resized(&self) -> bool {
        self.original_size != self.final_size
    }
}
