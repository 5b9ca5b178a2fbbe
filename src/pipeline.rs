//! Scrape pipeline orchestration.
//!
//! Runs the stages strictly in sequence:
//!
//! ```text
//! navigate ─▶ extract body ─▶ normalize ─▶ discover PDF links ─▶ extract each PDF ─▶ aggregate ─▶ publish
//! ```
//!
//! A target URL that itself ends in `.pdf` skips the browser entirely and
//! publishes the PDF's raw text. A discovered PDF that cannot be downloaded
//! is left out of the result; every other failure stops the scrape.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::io::{BufRead, Write};

use crate::browser::ChromeNavigator;
use crate::buckets::select_bucket;
use crate::config::{Config, ConflictPolicy};
use crate::error::ScrapeResult;
use crate::html::{
    discover_pdf_links, ensure_http_scheme, extract_body, has_pdf_extension, normalize,
};
use crate::models::AggregatedContent;
use crate::pdf::PdfFetcher;
use crate::progress::{ProgressMode, ScrapeEvent, ScrapeProgressReporter};
use crate::prompt::prompt_url;
use crate::publish::{publish, storage_key, Published};
use crate::storage::S3Store;
use crate::traits::{ObjectStore, PageSource};

/// Whether the scrape target is a PDF rather than a web page.
pub fn is_pdf_target(url: &str) -> bool {
    has_pdf_extension(url)
}

/// Produce the text that a scrape of `url` publishes, without publishing it.
pub async fn collect_content(
    url: &str,
    source: &dyn PageSource,
    pdfs: &PdfFetcher,
    dedupe_links: bool,
    progress: &dyn ScrapeProgressReporter,
) -> ScrapeResult<AggregatedContent> {
    if is_pdf_target(url) {
        progress.report(ScrapeEvent::PdfTarget {
            url: url.to_string(),
        });
        let text = pdfs.fetch_text(url).await?;
        progress.report(ScrapeEvent::PdfExtracted {
            url: url.to_string(),
            chars: text.chars().count(),
        });
        return Ok(AggregatedContent::from_pdf(url, &text));
    }

    progress.report(ScrapeEvent::Navigating {
        url: url.to_string(),
        source: source.name().to_string(),
    });
    let page = source.fetch_page(url).await?;
    progress.report(ScrapeEvent::PageLoaded {
        bytes: page.markup.len(),
    });

    let body = extract_body(&page.markup);
    progress.report(ScrapeEvent::BodyExtracted { bytes: body.len() });

    let cleaned = normalize(&body);
    tracing::debug!(
        markup_bytes = page.markup.len(),
        body_bytes = body.len(),
        lines = cleaned.lines().len(),
        "page reduced to text"
    );
    let mut content = AggregatedContent::from_page(&cleaned);
    progress.report(ScrapeEvent::Normalized {
        bytes: content.len(),
        lines: cleaned.lines().len(),
    });

    let links = discover_pdf_links(&page.markup, &page.url, dedupe_links);
    progress.report(ScrapeEvent::PdfLinksFound { count: links.len() });

    for link in links {
        match pdfs.fetch_text(&link).await {
            Ok(text) => {
                progress.report(ScrapeEvent::PdfExtracted {
                    url: link.clone(),
                    chars: text.chars().count(),
                });
                content.push_pdf(&link, &text);
            }
            Err(e) if !e.is_fatal() => {
                tracing::warn!(url = %link, error = %e, "skipping PDF");
                progress.report(ScrapeEvent::PdfSkipped {
                    url: link,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(content)
}

/// Everything a scrape needs besides the target and the destination.
pub struct Scraper<'a> {
    pub source: &'a dyn PageSource,
    pub pdfs: &'a PdfFetcher,
    pub store: &'a dyn ObjectStore,
    pub dedupe_links: bool,
    pub on_conflict: ConflictPolicy,
    pub progress: &'a dyn ScrapeProgressReporter,
}

impl Scraper<'_> {
    /// Scrape `url` and publish the result to `bucket` under the key for `now`.
    pub async fn scrape_to_store(
        &self,
        url: &str,
        bucket: &str,
        now: NaiveDateTime,
    ) -> ScrapeResult<Published> {
        let content = collect_content(
            url,
            self.source,
            self.pdfs,
            self.dedupe_links,
            self.progress,
        )
        .await?;

        let published = publish(self.store, bucket, url, content, now, self.on_conflict).await?;
        self.progress.report(ScrapeEvent::Published {
            bucket: published.bucket.clone(),
            key: published.key.to_string(),
            bytes: published.bytes,
        });
        Ok(published)
    }
}

/// `harvest scrape`: resolve the target and bucket, run the pipeline, and
/// print where the result went.
///
/// With `dry_run` nothing is uploaded and no credentials are needed; the key
/// and the content are printed to stdout instead.
pub async fn run_scrape(
    config: &Config,
    url: Option<String>,
    bucket: Option<String>,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let reporter = progress.reporter();
    let result = scrape(config, url, bucket, dry_run, reporter.as_ref()).await;
    if let Err(ref e) = result {
        reporter.report(ScrapeEvent::Failed {
            error: format!("{:#}", e),
        });
    }
    result
}

async fn scrape(
    config: &Config,
    url: Option<String>,
    bucket: Option<String>,
    dry_run: bool,
    reporter: &dyn ScrapeProgressReporter,
) -> Result<()> {
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stderr();

    let url = resolve_url(url, &mut input, &mut output)?;

    let navigator = ChromeNavigator::new(config.browser.clone());
    let pdfs = PdfFetcher::new(&config.http)?;

    if dry_run {
        let content = collect_content(
            &url,
            &navigator,
            &pdfs,
            config.pdf.dedupe_links,
            reporter,
        )
        .await
        .with_context(|| format!("scrape of {} failed", url))?;
        print_dry_run(&url, &content, Local::now().naive_local(), &mut std::io::stdout())?;
        return Ok(());
    }

    let store = S3Store::from_env(&config.storage, &config.http)
        .context("cannot connect to object storage")?;
    let bucket = select_bucket(
        bucket.as_deref(),
        config.storage.bucket.as_deref(),
        &store,
        &mut input,
        &mut output,
    )
    .await?;

    let scraper = Scraper {
        source: &navigator,
        pdfs: &pdfs,
        store: &store,
        dedupe_links: config.pdf.dedupe_links,
        on_conflict: config.storage.on_conflict,
        progress: reporter,
    };
    let published = scraper
        .scrape_to_store(&url, &bucket, Local::now().naive_local())
        .await
        .with_context(|| format!("scrape of {} failed", url))?;

    println!("s3://{}/{}", published.bucket, published.key);
    Ok(())
}

/// Dry-run output: the key on the first line, a blank line, then the content.
pub fn print_dry_run(
    url: &str,
    content: &AggregatedContent,
    now: NaiveDateTime,
    out: &mut dyn Write,
) -> Result<()> {
    writeln!(out, "{}", storage_key(url, now))?;
    writeln!(out)?;
    writeln!(out, "{}", content.as_str())?;
    Ok(())
}

/// The URL from the command line, or one read from `input` when none was
/// passed. Scheme-less targets are loaded over `http://`.
pub fn resolve_url(
    url: Option<String>,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<String> {
    let url = match url {
        Some(url) => url,
        None => prompt_url(input, output)?,
    };
    Ok(ensure_http_scheme(&url))
}
