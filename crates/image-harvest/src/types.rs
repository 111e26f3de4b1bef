//! Core data types shared by acquisition and transformation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A search request: what to look for and how many images are wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub requested_count: usize,
}

impl Query {
    /// Create a query. Rejects empty text and a zero count.
    pub fn new(text: impl Into<String>, requested_count: usize) -> HarvestResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(HarvestError::InvalidInput(
                "query text must not be empty".to_string(),
            ));
        }
        if !text.chars().any(char::is_alphanumeric) {
            return Err(HarvestError::InvalidInput(format!(
                "query text '{text}' has no letters or digits"
            )));
        }
        if requested_count == 0 {
            return Err(HarvestError::InvalidInput(
                "requested count must be positive".to_string(),
            ));
        }
        Ok(Self {
            text,
            requested_count,
        })
    }

    /// Folder name for raw images of this query: `images_<text>`, where every
    /// character other than a letter, digit, `-` or `_` becomes `_`. The
    /// result is always a single path component.
    pub fn folder_name(&self) -> String {
        let component: String = self
            .text
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("images_{component}")
    }

    /// Lowercase, hyphen-separated slug used by path-style search URLs.
    pub fn slug(&self) -> String {
        self.text
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Outcome of a single adapter invocation. Never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_name: String,
    /// Unique discovered URLs, in listing order.
    pub urls: Vec<String>,
    pub saved_count: usize,
}

impl SourceResult {
    /// Result for a source that produced nothing.
    pub fn empty(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            urls: Vec::new(),
            saved_count: 0,
        }
    }
}

/// Summary of a full acquisition run across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub folder: PathBuf,
    pub requested: usize,
    pub obtained: usize,
    /// One entry per adapter that was actually invoked, in invocation order.
    pub sources: Vec<SourceResult>,
}

impl AcquisitionReport {
    pub fn is_complete(&self) -> bool {
        self.obtained >= self.requested
    }
}

/// Summary of a batch transformation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    /// Images that went through every step of the chain.
    pub processed: usize,
    /// Files that could not be decoded.
    pub skipped: usize,
    /// Images whose artifacts could not all be written.
    pub failed: usize,
    /// Artifact files written, originals included.
    pub artifacts: usize,
}

/// Errors that can occur in the harvesting library.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Missing parameter for step '{0}'")]
    MissingParameter(String),

    #[error("Invalid parameter for step '{step}': {reason}")]
    InvalidParameter { step: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HarvestError {
    /// True for errors caused by the caller's step chain or parameter set.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarvestError::MissingParameter(_) | HarvestError::InvalidParameter { .. }
        )
    }
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
