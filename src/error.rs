//! Error taxonomy for the scrape pipeline.
//!
//! Each variant maps to one failure class and carries its own recovery rule:
//!
//! | Variant | Raised by | Effect |
//! |---------|-----------|--------|
//! | [`ScrapeError::Navigation`] | browser launch / page load | aborts the run |
//! | [`ScrapeError::Fetch`] | HTTP download of a page or PDF | aborts that resource |
//! | [`ScrapeError::Parse`] | PDF decoding | recovered as empty text |
//! | [`ScrapeError::Storage`] | bucket listing / object upload | aborts the run |

use thiserror::Error;

/// Result alias used by the pipeline stages.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser could not be started or the page could not be loaded.
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// An HTTP download failed (connect error or non-success status).
    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    /// A downloaded document could not be decoded.
    #[error("could not parse {url}: {message}")]
    Parse { url: String, message: String },

    /// The object store rejected a request.
    #[error("storage error on bucket '{bucket}': {message}")]
    Storage { bucket: String, message: String },

    /// Configuration or credentials are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn navigation(url: &str, message: impl ToString) -> Self {
        ScrapeError::Navigation {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn fetch(url: &str, message: impl ToString) -> Self {
        ScrapeError::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn parse(url: &str, message: impl ToString) -> Self {
        ScrapeError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn storage(bucket: &str, message: impl ToString) -> Self {
        ScrapeError::Storage {
            bucket: bucket.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the run must stop when this error surfaces.
    ///
    /// Fetch failures only abort the resource being downloaded; the caller
    /// decides whether that resource was the whole scrape.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScrapeError::Fetch { .. } | ScrapeError::Parse { .. })
    }
}
