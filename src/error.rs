//! Error types for the filter.
//!
//! Authoring mistakes never surface here; these cover the host-level
//! failures that make it impossible to hand a tree back to pandoc.

/// Result type alias for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Input was not valid JSON, or output could not be written as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error reading input or writing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON is not a pandoc document
    #[error("Not a pandoc document: {0}")]
    MalformedDocument(String),

    /// An external image conversion failed
    #[error("Image conversion failed: {0}")]
    Conversion(String),
}
