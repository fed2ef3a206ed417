//! Error types for the migration audit engine.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors for audit operations
//! - `Result<T>`: Type alias for Results using AppError
//!
//! Per-URL network, HTTP, and render failures are not errors at this level;
//! they are captured inside the stage results that produced them. Only
//! failures that abort a pipeline stage surface as `AppError`.

use thiserror::Error;

/// Domain-specific errors for audit operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Malformed input file (sitemap XML, CSV)
    #[error("Invalid input format: {0}")]
    InputFormat(String),

    /// Project does not exist in the store
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Document store operation failed
    #[error("Store error: {0}")]
    StoreError(String),

    /// A pipeline run is already in flight for this project
    #[error("Pipeline already running for project {0}")]
    PipelineBusy(String),

    /// Pipeline was cancelled via the cancel flag
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create an input-format error
    pub fn input_format(msg: impl Into<String>) -> Self {
        Self::InputFormat(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
