//! Error types for pixpilot-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pixpilot operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load template {path}: {message}")]
    Template {
        path: PathBuf,
        message: String,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for pixpilot operations
pub type Result<T> = std::result::Result<T, Error>;
