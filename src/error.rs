use thiserror::Error;

/// Main error type for PaperKG
#[derive(Error, Debug)]
pub enum PaperkgError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding gateway errors
    #[error("Embedding gateway error: {0}")]
    Embedding(String),

    /// Extraction gateway errors (network failure or schema-invalid output)
    #[error("Extraction gateway error: {0}")]
    Extraction(String),

    /// Parse errors (unknown vocabulary strings, malformed blobs)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenient Result type using PaperkgError
pub type Result<T> = std::result::Result<T, PaperkgError>;
