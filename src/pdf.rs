//! PDF download and text extraction.
//!
//! Downloads are strict: connect errors and non-2xx responses surface as
//! [`ScrapeError::Fetch`]. Decoding is lenient: a PDF that cannot be parsed
//! (including one that makes the parser panic) is logged and treated as
//! empty text so the rest of the scrape continues.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::html::ensure_http_scheme;
use crate::models::PdfResource;

/// HTTP client for PDF resources.
#[derive(Clone)]
pub struct PdfFetcher {
    client: reqwest::Client,
}

impl PdfFetcher {
    pub fn new(http: &HttpConfig) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download a PDF. Scheme-less references are fetched over `http://`.
    pub async fn fetch(&self, reference: &str) -> ScrapeResult<PdfResource> {
        let url = ensure_http_scheme(reference);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(&url, e))?;

        if !resp.status().is_success() {
            return Err(ScrapeError::fetch(&url, format!("HTTP {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ScrapeError::fetch(&url, e))?;

        Ok(PdfResource {
            url,
            bytes: bytes.to_vec(),
        })
    }

    /// Download a PDF and return its text, or an empty string when the
    /// document cannot be decoded. Download failures are still errors.
    pub async fn fetch_text(&self, reference: &str) -> ScrapeResult<String> {
        let resource = self.fetch(reference).await?;
        Ok(extract_text_lenient(resource).await)
    }
}

/// Text of every page in document order, concatenated without separators.
pub fn extract_text(resource: &PdfResource) -> ScrapeResult<String> {
    let bytes = resource.bytes.as_slice();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages.concat()),
        Ok(Err(e)) => Err(ScrapeError::parse(&resource.url, e)),
        Err(_) => Err(ScrapeError::parse(&resource.url, "PDF parser panicked")),
    }
}

/// Run [`extract_text`] off the async runtime, mapping parse failures to "".
pub async fn extract_text_lenient(resource: PdfResource) -> String {
    let url = resource.url.clone();
    let joined = tokio::task::spawn_blocking(move || extract_text(&resource)).await;

    match joined {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "error reading PDF");
            String::new()
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "PDF extraction task failed");
            String::new()
        }
    }
}
