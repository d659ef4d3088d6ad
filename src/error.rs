use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevscoutError {
    #[error("Bad input file: {0}")]
    BadInputFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
