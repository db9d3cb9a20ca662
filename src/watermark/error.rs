use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("WebP encoding failed: {0}")]
    WebPError(String),

    #[error("Unsupported output format for {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("Source has no file name: {0:?}")]
    InvalidSource(PathBuf),
}
