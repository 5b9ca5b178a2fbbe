//! Seams between the pipeline and the outside world.
//!
//! The pipeline only talks to a browser through [`PageSource`] and to a
//! bucket through [`ObjectStore`]. The shipped implementations are
//! [`ChromeNavigator`](crate::browser::ChromeNavigator) and
//! [`S3Store`](crate::storage::S3Store); tests plug in scripted pages and
//! in-memory buckets.
//!
//! ```text
//!   URL ──▶ PageSource ──▶ pipeline ──▶ ObjectStore ──▶ bucket
//! ```
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use page_harvest::error::ScrapeResult;
//! use page_harvest::models::PageDocument;
//! use page_harvest::traits::PageSource;
//!
//! pub struct StaticPage(&'static str);
//!
//! #[async_trait]
//! impl PageSource for StaticPage {
//!     fn name(&self) -> &str { "static" }
//!
//!     async fn fetch_page(&self, url: &str) -> ScrapeResult<PageDocument> {
//!         Ok(PageDocument { url: url.to_string(), markup: self.0.to_string() })
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ScrapeResult;
use crate::models::PageDocument;

// ═══════════════════════════════════════════════════════════════════════
// PageSource Trait
// ═══════════════════════════════════════════════════════════════════════

/// Something that turns a URL into rendered page markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Short identifier used in status output (e.g. `"chromium"`).
    fn name(&self) -> &str;

    /// Load `url` and return the rendered markup.
    ///
    /// Any session opened for the load must be released before this
    /// returns, whether or not the load succeeded.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Navigation`](crate::error::ScrapeError::Navigation)
    /// when the browser cannot start or the page cannot be loaded.
    async fn fetch_page(&self, url: &str) -> ScrapeResult<PageDocument>;
}

// ═══════════════════════════════════════════════════════════════════════
// ObjectStore Trait
// ═══════════════════════════════════════════════════════════════════════

/// A bucketed blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of all buckets visible to the caller.
    async fn list_buckets(&self) -> ScrapeResult<Vec<String>>;

    /// Whether `key` exists in `bucket`.
    async fn object_exists(&self, bucket: &str, key: &str) -> ScrapeResult<bool>;

    /// Write `body` under `key` in one request, replacing any existing object.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Storage`](crate::error::ScrapeError::Storage) when the
    /// bucket is missing or the caller lacks write permission.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> ScrapeResult<()>;
}
