use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaterfallError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Data shape mismatch: `{field}` has {actual} entries, expected {expected}")]
    DataShape {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Download unsupported: {0}")]
    DownloadUnsupported(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for WaterfallError {
    fn from(e: serde_json::Error) -> Self {
        WaterfallError::SerializationError(e.to_string())
    }
}

impl From<csv::Error> for WaterfallError {
    fn from(e: csv::Error) -> Self {
        WaterfallError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for WaterfallError {
    fn from(e: std::io::Error) -> Self {
        WaterfallError::Io(e.to_string())
    }
}
