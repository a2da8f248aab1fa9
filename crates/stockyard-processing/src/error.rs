use stockyard_core::AppError;

/// Image analysis and hashing errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image format {detected} does not match declared type {declared}")]
    FormatMismatch { detected: String, declared: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl From<::image::ImageError> for ProcessingError {
    fn from(err: ::image::ImageError) -> Self {
        ProcessingError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProcessingError {
    fn from(err: tokio::task::JoinError) -> Self {
        ProcessingError::Task(err.to_string())
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}
