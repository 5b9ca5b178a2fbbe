//! Publisher: writes an [`AggregatedContent`] blob into a bucket.
//!
//! The key is derived from the local date and the target URL (see
//! [`StorageKey::derive`]). The blob is uploaded with a single `PutObject`,
//! so a reader sees either the previous object or the complete new one.

use chrono::NaiveDateTime;

use crate::config::ConflictPolicy;
use crate::error::ScrapeResult;
use crate::models::{AggregatedContent, StorageKey};
use crate::traits::ObjectStore;

pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Where a scrape ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub bucket: String,
    pub key: StorageKey,
    pub bytes: usize,
}

/// Key the publisher will use for `target_url` at local time `now`,
/// before any conflict handling.
pub fn storage_key(target_url: &str, now: NaiveDateTime) -> StorageKey {
    StorageKey::derive(target_url, now.date())
}

/// Upload `content` to `bucket`.
///
/// With [`ConflictPolicy::Overwrite`] an existing object under the same key
/// is replaced. With [`ConflictPolicy::Version`] the key gets an `(HHMMSS)`
/// suffix when the plain key is already taken.
pub async fn publish(
    store: &dyn ObjectStore,
    bucket: &str,
    target_url: &str,
    content: AggregatedContent,
    now: NaiveDateTime,
    policy: ConflictPolicy,
) -> ScrapeResult<Published> {
    let mut key = storage_key(target_url, now);

    if policy == ConflictPolicy::Version && store.object_exists(bucket, key.as_str()).await? {
        let versioned = key.with_suffix(&now.format("%H%M%S").to_string());
        tracing::debug!(existing = %key, new = %versioned, "key taken, writing versioned object");
        key = versioned;
    }

    let bytes = content.len();
    store
        .put_object(bucket, key.as_str(), content.into_bytes(), CONTENT_TYPE)
        .await?;

    Ok(Published {
        bucket: bucket.to_string(),
        key,
        bytes,
    })
}
