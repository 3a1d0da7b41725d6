//! Error types for vlogkv
//!
//! Provides a unified error type for all operations.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using VlogError
pub type Result<T> = std::result::Result<T, VlogError>;

/// Unified error type for vlogkv operations
///
/// `Clone` so that an iterator can keep reporting a failure through
/// `status()` after handing it out from `value()`.
#[derive(Debug, Clone, Error)]
pub enum VlogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    // -------------------------------------------------------------------------
    // Log / Format Errors
    // -------------------------------------------------------------------------
    #[error("Corruption: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// Key is absent from a single SSTable (the caller moves on to the next)
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Open / Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Column context
    // -------------------------------------------------------------------------
    #[error("column {column}: {source}")]
    Column {
        column: String,
        #[source]
        source: Box<VlogError>,
    },
}

impl From<std::io::Error> for VlogError {
    fn from(err: std::io::Error) -> Self {
        VlogError::Io(Arc::new(err))
    }
}

impl VlogError {
    /// Annotate this error with the column it happened in.
    ///
    /// Errors already carrying a column are returned unchanged.
    pub fn in_column(self, column: &str) -> Self {
        match self {
            VlogError::Column { .. } => self,
            other => VlogError::Column {
                column: column.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, with any column annotation stripped
    pub fn root(&self) -> &VlogError {
        match self {
            VlogError::Column { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self.root(), VlogError::Corruption(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self.root(), VlogError::Io(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.root(), VlogError::InvalidArgument(_))
    }
}
