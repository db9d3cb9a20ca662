use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
