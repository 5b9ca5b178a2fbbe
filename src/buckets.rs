//! Destination bucket listing and selection.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

use crate::prompt;
use crate::traits::ObjectStore;

/// Print every bucket visible to the credentials, one per line.
pub async fn run_buckets(store: &dyn ObjectStore) -> Result<()> {
    let buckets = store
        .list_buckets()
        .await
        .context("failed to list buckets")?;

    if buckets.is_empty() {
        eprintln!("No buckets found.");
        return Ok(());
    }
    for bucket in buckets {
        println!("{}", bucket);
    }
    Ok(())
}

/// Decide which bucket a scrape goes to.
///
/// An explicit `--bucket` wins, then `storage.bucket` from config. Otherwise
/// the buckets are listed: a single bucket is used as-is, several are
/// offered as a numbered choice on `input`/`output`.
pub async fn select_bucket(
    explicit: Option<&str>,
    configured: Option<&str>,
    store: &dyn ObjectStore,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<String> {
    if let Some(bucket) = explicit.or(configured) {
        return Ok(bucket.to_string());
    }

    let buckets = store
        .list_buckets()
        .await
        .context("failed to list buckets")?;

    match buckets.len() {
        0 => bail!("no buckets available; create one or pass --bucket"),
        1 => {
            tracing::debug!(bucket = %buckets[0], "only one bucket visible, using it");
            Ok(buckets[0].clone())
        }
        _ => Ok(prompt::choose("Available buckets:", &buckets, input, output)?.to_string()),
    }
}
