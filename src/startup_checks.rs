use crate::batch::BatchOptions;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Input folder does not exist: {0:?}")]
    InputFolderMissing(PathBuf),

    #[error("Input path is not a directory: {0:?}")]
    InputNotADirectory(PathBuf),

    #[error("Watermark text must not be empty")]
    EmptyWatermarkText,

    #[error("Logo file does not exist: {0:?}")]
    LogoMissing(PathBuf),

    #[error("Attribution CSV does not exist: {0:?}")]
    AttributionCsvMissing(PathBuf),

    #[error("Output path exists and is not a directory: {0:?}")]
    OutputNotADirectory(PathBuf),
}

/// Validate a batch before any file is touched. Every problem found is
/// reported, not just the first.
pub fn check_batch_options(options: &BatchOptions) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Checking batch configuration...");

    let input = &options.input_folder;
    if !input.exists() {
        error!("Input folder does not exist: {:?}", input);
        errors.push(StartupCheckError::InputFolderMissing(input.clone()));
    } else if !input.is_dir() {
        error!("Input path is not a directory: {:?}", input);
        errors.push(StartupCheckError::InputNotADirectory(input.clone()));
    } else {
        info!("Input folder exists: {:?}", input);
    }

    if options.watermark_text.trim().is_empty() {
        error!("Watermark text is empty");
        errors.push(StartupCheckError::EmptyWatermarkText);
    }

    if let Some(logo) = &options.logo {
        if logo.is_file() {
            info!("Logo file found: {:?}", logo);
        } else {
            error!("Logo file does not exist: {:?}", logo);
            errors.push(StartupCheckError::LogoMissing(logo.clone()));
        }
    }

    if let Some(csv_path) = &options.attribution_csv {
        if csv_path.is_file() {
            info!("Attribution CSV found: {:?}", csv_path);
        } else {
            error!("Attribution CSV does not exist: {:?}", csv_path);
            errors.push(StartupCheckError::AttributionCsvMissing(csv_path.clone()));
        }
    }

    let output = &options.output_folder;
    if output.exists() && !output.is_dir() {
        error!("Output path is not a directory: {:?}", output);
        errors.push(StartupCheckError::OutputNotADirectory(output.clone()));
    }

    if errors.is_empty() {
        info!("All batch checks passed");
        Ok(())
    } else {
        error!("Batch checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_options(temp_dir: &TempDir) -> BatchOptions {
        let input = temp_dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        BatchOptions::new(input, temp_dir.path().join("out"), "Contest 2024")
    }

    #[test]
    fn test_valid_options_pass() {
        let temp_dir = TempDir::new().unwrap();
        assert!(check_batch_options(&valid_options(&temp_dir)).is_ok());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = valid_options(&temp_dir);
        options.input_folder = temp_dir.path().join("missing");
        options.watermark_text = "   ".to_string();
        options.logo = Some(temp_dir.path().join("logo.png"));
        options.attribution_csv = Some(temp_dir.path().join("people.csv"));

        let errors = check_batch_options(&options).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], StartupCheckError::InputFolderMissing(_)));
        assert!(matches!(errors[1], StartupCheckError::EmptyWatermarkText));
        assert!(matches!(errors[2], StartupCheckError::LogoMissing(_)));
        assert!(matches!(errors[3], StartupCheckError::AttributionCsvMissing(_)));
    }

    #[test]
    fn test_input_file_is_not_a_folder() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = valid_options(&temp_dir);
        let file = temp_dir.path().join("photo.jpg");
        std::fs::write(&file, b"x").unwrap();
        options.input_folder = file;

        let errors = check_batch_options(&options).unwrap_err();
        assert!(matches!(errors[0], StartupCheckError::InputNotADirectory(_)));
    }

    #[test]
    fn test_output_must_not_be_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = valid_options(&temp_dir);
        let file = temp_dir.path().join("taken");
        std::fs::write(&file, b"x").unwrap();
        options.output_folder = file;

        let errors = check_batch_options(&options).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StartupCheckError::OutputNotADirectory(_)));
    }
}
