use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod attribution;
pub mod batch;
pub mod discovery;
pub mod fonts;
pub mod startup_checks;
pub mod watermark;

use batch::{BatchOptions, DEFAULT_LOG_FILE_NAME};
use watermark::{EncodeSettings, ImageSize, ProcessorSettings};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

/// Batch inputs. All optional here since the command line can supply them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub input_folder: Option<PathBuf>,
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
    #[serde(default)]
    pub watermark_text: Option<String>,
    #[serde(default)]
    pub attribution_csv: Option<PathBuf>,
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub dual_output: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatermarkConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_webp_quality")]
    pub webp_quality: f32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
}

fn default_max_width() -> u32 {
    1920
}

fn default_max_height() -> u32 {
    1080
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_webp_quality() -> f32 {
    85.0
}

fn default_log_file_name() -> String {
    DEFAULT_LOG_FILE_NAME.to_string()
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            jpeg_quality: default_jpeg_quality(),
            webp_quality: default_webp_quality(),
            font_path: None,
            log_file_name: default_log_file_name(),
        }
    }
}

impl WatermarkConfig {
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            max_size: ImageSize::new(self.max_width, self.max_height),
            encode: EncodeSettings {
                jpeg_quality: self.jpeg_quality.clamp(1, 100),
                webp_quality: self.webp_quality.clamp(0.0, 100.0),
            },
            font_path: self.font_path.clone(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, toml_edit::de::Error> {
        toml_edit::de::from_str(content)
    }

    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(Self::from_toml_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Batch options from the `[batch]` table. Missing required values come
    /// back empty and are rejected by the batch checks.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            input_folder: self.batch.input_folder.clone().unwrap_or_default(),
            output_folder: self.batch.output_folder.clone().unwrap_or_default(),
            watermark_text: self.batch.watermark_text.clone().unwrap_or_default(),
            attribution_csv: self.batch.attribution_csv.clone(),
            logo: self.batch.logo.clone(),
            dual_output: self.batch.dual_output,
            log_file_name: self.watermark.log_file_name.clone(),
        }
    }
}
