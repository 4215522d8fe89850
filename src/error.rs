use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source library error: {0}")]
    SourceLibrary(String),

    #[error("Invalid content URL {url}: {reason}")]
    InvalidUri { url: String, reason: String },

    #[error("File could not be read by the catalog: {0}")]
    UnreadableFile(String),

    #[error("File type not supported by the catalog: {0}")]
    UnsupportedFile(String),

    #[error("Track is not modifiable yet: {0}")]
    NotModifiable(String),

    #[error("Target catalog unavailable: {0}")]
    TargetUnavailable(String),

    #[error("System clock error: {0}")]
    Clock(String),

    #[error("{0} cannot be represented as a 32 bit integer")]
    OutOfRange(i64),

    #[error("Rating {0} is outside of 0..=5 stars")]
    InvalidRating(i32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// The target rejected a write because it is still busy with a freshly
    /// added item. Retrying the whole registration usually succeeds.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::NotModifiable(_))
    }

    /// Errors that abort the whole run instead of a single item.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            AppError::SourceLibrary(_)
                | AppError::TargetUnavailable(_)
                | AppError::Io(_)
                | AppError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AppError::NotModifiable("a".into()).is_transient());
        assert!(!AppError::NotModifiable("a".into()).is_systemic());
        assert!(AppError::TargetUnavailable("down".into()).is_systemic());
        assert!(!AppError::UnreadableFile("x.mp3".into()).is_systemic());
        assert!(!AppError::UnsupportedFile("x.txt".into()).is_transient());
    }
}
