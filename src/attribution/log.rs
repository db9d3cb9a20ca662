use super::AttributionError;
use crate::watermark::{ImageSize, OutputMode};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error};

/// Placeholder written for attribution fields with no value.
const NOT_AVAILABLE: &str = "N/A";

/// One line of the watermarking log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub filename: String,
    pub photographer: String,
    pub team_name: String,
    pub caption: String,
    pub date_processed: String,
    pub watermark_text: String,
    pub mode: OutputMode,
    pub original_size: String,
    pub final_size: String,
    pub resized: bool,
}

impl AuditRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filename: &str,
        photographer: &str,
        team_name: &str,
        caption: &str,
        watermark_text: &str,
        mode: OutputMode,
        original_size: ImageSize,
        final_size: ImageSize,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            photographer: or_not_available(photographer),
            team_name: or_not_available(team_name),
            caption: or_not_available(caption),
            date_processed: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            watermark_text: watermark_text.to_string(),
            mode,
            original_size: original_size.to_string(),
            final_size: final_size.to_string(),
            resized: original_size != final_size,
        }
    }
}

fn or_not_available(value: &str) -> String {
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

/// Appends audit rows to CSV logs. Appends are serialized so rows from
/// concurrent callers never interleave.
#[derive(Debug, Default)]
pub struct AttributionLogger {
    write_lock: Mutex<()>,
}

impl AttributionLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `row` to `log_path`, creating the file and its header on first
    /// use. Failures are logged and swallowed.
    pub fn append(&self, log_path: &Path, row: &AuditRow) {
        if let Err(e) = self.try_append(log_path, row) {
            error!("Failed to write attribution log {:?}: {}", log_path, e);
        }
    }

    pub fn try_append(&self, log_path: &Path, row: &AuditRow) -> Result<(), AttributionError> {
        // A poisoned lock only means another append panicked; the file is
        // still usable.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = std::fs::metadata(log_path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;

        debug!("Logged {} to {:?}", row.filename, log_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(name: &str) -> AuditRow {
        AuditRow::new(
            name,
            "Jane",
            "",
            "A caption, with comma",
            "Contest 2024",
            OutputMode::Normal,
            ImageSize::new(3000, 2000),
            ImageSize::new(1620, 1080),
        )
    }

    #[test]
    fn test_header_written_once() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("watermarking_log.csv");
        let logger = AttributionLogger::new();

        logger.append(&log_path, &row("first.jpg"));
        logger.append(&log_path, &row("second.jpg"));

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "filename,photographer,team_name,caption,date_processed,watermark_text,mode,original_size,final_size,resized"
        );
        assert!(lines[1].starts_with("first.jpg,Jane,N/A,\"A caption, with comma\","));
        assert!(lines[2].starts_with("second.jpg,"));
        assert!(lines[1].ends_with(",Contest 2024,normal,3000x2000,1620x1080,true"));
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested/deeper/log.csv");
        let logger = AttributionLogger::new();

        logger.append(&log_path, &row("a.png"));
        assert!(log_path.exists());
    }

    #[test]
    fn test_existing_log_is_appended_without_new_header() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("log.csv");

        AttributionLogger::new().append(&log_path, &row("one.jpg"));
        AttributionLogger::new().append(&log_path, &row("two.jpg"));

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.matches("filename,photographer").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_unwritable_log_does_not_panic() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be
        let log_path = temp_dir.path().join("taken");
        std::fs::create_dir(&log_path).unwrap();

        let logger = AttributionLogger::new();
        logger.append(&log_path, &row("x.jpg"));
        assert!(logger.try_append(&log_path, &row("x.jpg")).is_err());
    }

    #[test]
    fn test_unresized_row_reports_false() {
        let same = AuditRow::new(
            "s.png",
            "",
            "",
            "",
            "",
            OutputMode::Protected,
            ImageSize::new(10, 10),
            ImageSize::new(10, 10),
        );
        assert!(!same.resized);
        assert_eq!(same.photographer, "N/A");
        assert_eq!(same.watermark_text, "");
    }
}
