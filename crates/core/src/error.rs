//! Error types for crawlmark operations.
//!
//! This module defines the main error type [`CrawlError`] which covers the
//! failure classes a crawl can surface: fetch failures, pages whose article
//! cannot be extracted, request validation problems and internal conversion
//! faults.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::{CrawlError, Result};
//!
//! fn require_url(url: Option<&str>) -> Result<&str> {
//!     match url {
//!         Some(u) if !u.trim().is_empty() => Ok(u),
//!         _ => Err(CrawlError::Validation("url is required".to_string())),
//!     }
//! }
//! # assert!(require_url(None).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fetch, extraction and conversion operations.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Transport-level HTTP failures from reqwest.
    ///
    /// DNS failures, refused connections, TLS problems and body read errors
    /// all land here.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Failed to fetch {url}: {status} {reason}")]
    FetchStatus { url: String, status: u16, reason: String },

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Missing or malformed request input, rejected before any core logic runs.
    #[error("{0}")]
    Validation(String),

    /// The article extractor found nothing readable on the page.
    ///
    /// This is distinct from an empty-but-valid article: the page was
    /// fetched and parsed, but no main content could be isolated.
    #[error("Failed to parse article: content not extractable")]
    NotExtractable,

    /// An internal defect while walking or serializing the tree.
    ///
    /// [`crate::html_to_markdown`] swallows this (after logging it) and
    /// returns an empty string; [`crate::try_html_to_markdown`] surfaces it.
    #[error("Markdown conversion failed: {0}")]
    ConversionFault(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrawlError {
    /// Whether this error originated in the fetch collaborator.
    pub fn is_fetch_error(&self) -> bool {
        match self {
            #[cfg(feature = "fetch")]
            CrawlError::HttpError(_) => true,
            CrawlError::FetchStatus { .. } | CrawlError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for CrawlError.
pub type Result<T> = std::result::Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrawlError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_fetch_status_error() {
        let err = CrawlError::FetchStatus {
            url: "https://example.com".to_string(),
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to fetch https://example.com: 404 Not Found");
        assert!(err.is_fetch_error());
    }

    #[test]
    fn test_timeout_error() {
        let err = CrawlError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
        assert!(err.is_fetch_error());
    }

    #[test]
    fn test_extraction_error_is_not_fetch_error() {
        let err = CrawlError::NotExtractable;
        assert!(!err.is_fetch_error());
        assert!(err.to_string().contains("not extractable"));
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = CrawlError::Validation("url is required".to_string());
        assert_eq!(err.to_string(), "url is required");
    }
}
