mod compositor;
mod error;
pub mod formats;
pub mod layout;
pub mod logo;
pub mod text;
mod types;

pub use compositor::{ProcessorSettings, WatermarkProcessor, downscale_to_fit, resolve_photographer};
pub use error::WatermarkError;
pub use formats::EncodeSettings;
pub use types::{ImageSize, OutputFormat, OutputMode, WatermarkOutcome, WatermarkRequest};
