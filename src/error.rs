// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for utilkit

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for utilkit operations
pub type Result<T> = std::result::Result<T, UtilkitError>;

/// utilkit error types
#[derive(Error, Debug)]
pub enum UtilkitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Seam carving error: {0}")]
    Carving(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("QR code error: {0}")]
    Qr(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl UtilkitError {
    /// Create an invalid-argument (usage) error
    pub fn invalid(msg: impl Into<String>) -> Self {
        UtilkitError::InvalidArgument(msg.into())
    }
}

impl From<lopdf::Error> for UtilkitError {
    fn from(e: lopdf::Error) -> Self {
        UtilkitError::Pdf(e.to_string())
    }
}
