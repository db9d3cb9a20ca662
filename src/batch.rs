use crate::discovery::ImageRecord;
use crate::startup_checks::{self, StartupCheckError};
use crate::watermark::{OutputMode, ProcessorSettings, WatermarkProcessor, WatermarkRequest};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_LOG_FILE_NAME: &str = "watermarking_log.csv";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid configuration: {}", describe(.0))]
    InvalidConfiguration(Vec<StartupCheckError>),

    #[error("No images found in {0:?}")]
    NoImagesFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe(errors: &[StartupCheckError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything one batch run needs to know.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub watermark_text: String,
    pub attribution_csv: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    /// Write both a normal and a protected variant of every image.
    pub dual_output: bool,
    pub log_file_name: String,
}

impl BatchOptions {
    pub fn new(
        input_folder: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        watermark_text: impl Into<String>,
    ) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_folder: output_folder.into(),
            watermark_text: watermark_text.into(),
            attribution_csv: None,
            logo: None,
            dual_output: false,
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
        }
    }

    /// Output roots in the order each image is rendered into them.
    pub fn output_variants(&self) -> Vec<OutputVariant> {
        let variant = |mode, dir: &str| {
            let root = self.output_folder.join(dir);
            OutputVariant {
                mode,
                log_path: root.join(&self.log_file_name),
                root,
            }
        };

        if self.dual_output {
            vec![
                variant(OutputMode::Normal, "output_normal"),
                variant(OutputMode::Protected, "output_protected"),
            ]
        } else {
            vec![variant(OutputMode::Normal, "output")]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVariant {
    pub mode: OutputMode,
    pub root: PathBuf,
    pub log_path: PathBuf,
}

impl OutputVariant {
    /// `<root>/<photographer>/<file>` for records with a photographer folder,
    /// `<root>/<file>` otherwise.
    pub fn destination_for(&self, record: &ImageRecord) -> PathBuf {
        let file_name = record.file_name();
        match &record.subfolder {
            Some(folder) => self.root.join(folder).join(file_name),
            None => self.root.join(file_name),
        }
    }
}

/// Per-variant counters of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSummary {
    pub mode: OutputMode,
    pub output_root: PathBuf,
    pub log_path: PathBuf,
    pub success_count: usize,
    /// Source paths (relative to the input folder) that failed.
    pub failures: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total_count: usize,
    /// Images actually attempted; lower than `total_count` after cancellation.
    pub attempted_count: usize,
    pub variants: Vec<VariantSummary>,
    pub photographers: BTreeSet<String>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn success_count(&self, mode: OutputMode) -> usize {
        self.variants
            .iter()
            .filter(|variant| variant.mode == mode)
            .map(|variant| variant.success_count)
            .sum()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled
            && self
                .variants
                .iter()
                .all(|variant| variant.success_count == self.total_count)
    }
}

/// Outcome of one variant of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantResult {
    pub mode: OutputMode,
    pub success: bool,
}

/// Progress callbacks. All methods default to doing nothing.
pub trait BatchObserver {
    fn on_start(&self, _total: usize) {}

    fn on_item(
        &self,
        _index: usize,
        _total: usize,
        _record: &ImageRecord,
        _results: &[VariantResult],
    ) {
    }

    fn on_complete(&self, _summary: &BatchSummary) {}
}

pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Reports progress through `tracing`.
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_start(&self, total: usize) {
        info!("Processing {} images", total);
    }

    fn on_item(&self, index: usize, total: usize, record: &ImageRecord, results: &[VariantResult]) {
        for result in results {
            if result.success {
                info!(
                    "[{}/{}] {} ({}) done",
                    index + 1,
                    total,
                    record.relative_path.display(),
                    result.mode
                );
            } else {
                warn!(
                    "[{}/{}] {} ({}) failed",
                    index + 1,
                    total,
                    record.relative_path.display(),
                    result.mode
                );
            }
        }
    }

    fn on_complete(&self, summary: &BatchSummary) {
        for variant in &summary.variants {
            info!(
                "{}: {}/{} images watermarked into {:?}",
                variant.mode, variant.success_count, summary.total_count, variant.output_root
            );
        }
        if summary.cancelled {
            warn!(
                "Batch cancelled after {} of {} images",
                summary.attempted_count, summary.total_count
            );
        }
    }
}

/// Drives a [`WatermarkProcessor`] over a whole input folder.
pub struct BatchDriver {
    processor: WatermarkProcessor,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchDriver {
    pub fn new(settings: ProcessorSettings) -> Self {
        Self::with_processor(WatermarkProcessor::new(settings))
    }

    pub fn with_processor(processor: WatermarkProcessor) -> Self {
        Self {
            processor,
            cancel: None,
        }
    }

    /// Once the flag is set no further images are started.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn processor(&self) -> &WatermarkProcessor {
        &self.processor
    }

    pub fn run(
        &mut self,
        options: &BatchOptions,
        observer: &dyn BatchObserver,
    ) -> Result<BatchSummary, BatchError> {
        startup_checks::check_batch_options(options).map_err(BatchError::InvalidConfiguration)?;

        if let Some(logo) = &options.logo
            && !self.processor.load_logo(logo)
        {
            warn!("Continuing without a logo");
        }

        let variants = options.output_variants();
        for variant in &variants {
            std::fs::create_dir_all(&variant.root)?;
            debug!("Output root ready: {:?}", variant.root);
        }

        if let Some(csv_path) = &options.attribution_csv {
            let known = self.processor.load_attribution_csv(csv_path);
            info!("{} attribution entries available", known);
        }

        let images = self.processor.find_all_images(&options.input_folder);
        if images.is_empty() {
            return Err(BatchError::NoImagesFound(options.input_folder.clone()));
        }

        let photographers = photographer_roster(&images);
        if !photographers.is_empty() {
            info!(
                "Photographers: {}",
                photographers.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }

        let total = images.len();
        let mut summaries: Vec<VariantSummary> = variants
            .iter()
            .map(|variant| VariantSummary {
                mode: variant.mode,
                output_root: variant.root.clone(),
                log_path: variant.log_path.clone(),
                success_count: 0,
                failures: Vec::new(),
            })
            .collect();

        observer.on_start(total);

        let mut attempted = 0;
        let mut cancelled = false;
        for (index, record) in images.iter().enumerate() {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut results = Vec::with_capacity(variants.len());
            for (variant, summary) in variants.iter().zip(summaries.iter_mut()) {
                let request = WatermarkRequest {
                    source_path: record.path.clone(),
                    destination_path: variant.destination_for(record),
                    watermark_text: options.watermark_text.clone(),
                    log_path: variant.log_path.clone(),
                    photographer: record.photographer.clone(),
                    subfolder: record.subfolder.clone(),
                    mode: variant.mode,
                };

                let success = self.processor.add_watermark(&request);
                if success {
                    summary.success_count += 1;
                } else {
                    summary.failures.push(record.relative_path.clone());
                }
                results.push(VariantResult {
                    mode: variant.mode,
                    success,
                });
            }

            attempted += 1;
            observer.on_item(index, total, record, &results);
        }

        let summary = BatchSummary {
            total_count: total,
            attempted_count: attempted,
            variants: summaries,
            photographers,
            cancelled,
        };

        for variant in &summary.variants {
            for failed in &variant.failures {
                error!("{} variant failed for {:?}", variant.mode, failed);
            }
        }

        observer.on_complete(&summary);
        Ok(summary)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Distinct photographer folder names among the discovered images.
pub fn photographer_roster(images: &[ImageRecord]) -> BTreeSet<String> {
    images
        .iter()
        .filter_map(|record| record.photographer.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn record(path: &str, photographer: Option<&str>) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from("/in").join(path),
            photographer: photographer.map(str::to_string),
            subfolder: photographer.map(str::to_string),
            relative_path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_single_output_layout() {
        let options = BatchOptions::new("/in", "/out", "Contest");
        let variants = options.output_variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].mode, OutputMode::Normal);
        assert_eq!(variants[0].root, Path::new("/out/output"));
        assert_eq!(
            variants[0].log_path,
            Path::new("/out/output/watermarking_log.csv")
        );
    }

    #[test]
    fn test_dual_output_layout() {
        let mut options = BatchOptions::new("/in", "/out", "Contest");
        options.dual_output = true;
        options.log_file_name = "audit.csv".to_string();

        let variants = options.output_variants();
        let modes: Vec<OutputMode> = variants.iter().map(|v| v.mode).collect();
        assert_eq!(modes, vec![OutputMode::Normal, OutputMode::Protected]);
        assert_eq!(variants[0].root, Path::new("/out/output_normal"));
        assert_eq!(variants[1].root, Path::new("/out/output_protected"));
        assert_eq!(
            variants[1].log_path,
            Path::new("/out/output_protected/audit.csv")
        );
    }

    #[test]
    fn test_destination_nests_photographer_folder() {
        let variant = BatchOptions::new("/in", "/out", "x").output_variants().remove(0);

        assert_eq!(
            variant.destination_for(&record("Jane/a.JPG", Some("Jane"))),
            Path::new("/out/output/Jane/a.JPG")
        );
        assert_eq!(
            variant.destination_for(&record("b.png", None)),
            Path::new("/out/output/b.png")
        );
        // only the immediate parent survives
        assert_eq!(
            variant.destination_for(&record("Jane/Sub/c.webp", Some("Sub"))),
            Path::new("/out/output/Sub/c.webp")
        );
    }

    #[test]
    fn test_roster_is_sorted_and_distinct() {
        let images = vec![
            record("Zoe/1.jpg", Some("Zoe")),
            record("root.jpg", None),
            record("Adam/2.jpg", Some("Adam")),
            record("Zoe/3.jpg", Some("Zoe")),
        ];
        let roster: Vec<String> = photographer_roster(&images).into_iter().collect();
        assert_eq!(roster, vec!["Adam".to_string(), "Zoe".to_string()]);
    }

    #[test]
    fn test_summary_counts_per_mode() {
        let summary = BatchSummary {
            total_count: 3,
            attempted_count: 3,
            variants: vec![
                VariantSummary {
                    mode: OutputMode::Normal,
                    output_root: PathBuf::from("n"),
                    log_path: PathBuf::from("n/log.csv"),
                    success_count: 3,
                    failures: Vec::new(),
                },
                VariantSummary {
                    mode: OutputMode::Protected,
                    output_root: PathBuf::from("p"),
                    log_path: PathBuf::from("p/log.csv"),
                    success_count: 2,
                    failures: vec![PathBuf::from("bad.jpg")],
                },
            ],
            photographers: BTreeSet::new(),
            cancelled: false,
        };
        assert_eq!(summary.success_count(OutputMode::Normal), 3);
        assert_eq!(summary.success_count(OutputMode::Protected), 2);
        assert!(!summary.all_succeeded());
    }
}
