//! Scrape progress reporting.
//!
//! Every pipeline stage emits a [`ScrapeEvent`] so the operator sees what is
//! happening while the browser and downloads run. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts (`--dry-run` output,
//! published keys).

use std::io::Write;

/// A single progress event for a scrape run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScrapeEvent {
    /// The page source (e.g. `chromium`) is loading the target page.
    Navigating { url: String, source: String },
    /// Rendered markup captured.
    PageLoaded { bytes: usize },
    /// Body subtree isolated.
    BodyExtracted { bytes: usize },
    /// Visible text normalized.
    Normalized { bytes: usize, lines: usize },
    /// Anchor scan finished.
    PdfLinksFound { count: usize },
    /// The target URL itself is a PDF; the browser is skipped.
    PdfTarget { url: String },
    /// Text extracted from one PDF (possibly empty on decode failure).
    PdfExtracted { url: String, chars: usize },
    /// One PDF could not be downloaded and was left out.
    PdfSkipped { url: String, error: String },
    /// Upload finished.
    Published {
        bucket: String,
        key: String,
        bytes: usize,
    },
    /// The run stopped on a fatal error.
    Failed { error: String },
}

/// Reports scrape progress. Implementations write to stderr (human or JSON).
pub trait ScrapeProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the scrape pipeline.
    fn report(&self, event: ScrapeEvent);
}

/// Human-friendly progress on stderr: "scrape  page loaded  48,210 bytes".
pub struct StderrProgress;

impl ScrapeProgressReporter for StderrProgress {
    fn report(&self, event: ScrapeEvent) {
        let line = human_line(&event);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

fn human_line(event: &ScrapeEvent) -> String {
    match event {
        ScrapeEvent::Navigating { url, source } => {
            format!("scrape  loading {} via {}\n", url, source)
        }
        ScrapeEvent::PageLoaded { bytes } => {
            format!("scrape  page loaded  {} bytes\n", format_number(*bytes as u64))
        }
        ScrapeEvent::BodyExtracted { bytes } => {
            format!("scrape  body extracted  {} bytes\n", format_number(*bytes as u64))
        }
        ScrapeEvent::Normalized { bytes, lines } => format!(
            "scrape  cleaned text  {} bytes, {} lines\n",
            format_number(*bytes as u64),
            format_number(*lines as u64)
        ),
        ScrapeEvent::PdfLinksFound { count } => format!("scrape  pdf links found  {}\n", count),
        ScrapeEvent::PdfTarget { url } => {
            format!("scrape  PDF detected, extracting text from {}\n", url)
        }
        ScrapeEvent::PdfExtracted { url, chars } => format!(
            "scrape  pdf text  {} chars from {}\n",
            format_number(*chars as u64),
            url
        ),
        ScrapeEvent::PdfSkipped { url, error } => {
            format!("scrape  pdf skipped  {}: {}\n", url, error)
        }
        ScrapeEvent::Published { bucket, key, bytes } => format!(
            "scrape  saved {} bytes to s3://{}/{}\n",
            format_number(*bytes as u64),
            bucket,
            key
        ),
        ScrapeEvent::Failed { error } => format!("scrape  failed: {}\n", error),
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScrapeProgressReporter for JsonProgress {
    fn report(&self, event: ScrapeEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn json_event(event: &ScrapeEvent) -> serde_json::Value {
    match event {
        ScrapeEvent::Navigating { url, source } => serde_json::json!({
            "event": "progress", "stage": "navigate", "url": url, "source": source
        }),
        ScrapeEvent::PageLoaded { bytes } => serde_json::json!({
            "event": "progress", "stage": "page_loaded", "bytes": bytes
        }),
        ScrapeEvent::BodyExtracted { bytes } => serde_json::json!({
            "event": "progress", "stage": "extract", "bytes": bytes
        }),
        ScrapeEvent::Normalized { bytes, lines } => serde_json::json!({
            "event": "progress", "stage": "normalize", "bytes": bytes, "lines": lines
        }),
        ScrapeEvent::PdfLinksFound { count } => serde_json::json!({
            "event": "progress", "stage": "discover_pdf_links", "count": count
        }),
        ScrapeEvent::PdfTarget { url } => serde_json::json!({
            "event": "progress", "stage": "pdf_target", "url": url
        }),
        ScrapeEvent::PdfExtracted { url, chars } => serde_json::json!({
            "event": "progress", "stage": "extract_pdf", "url": url, "chars": chars
        }),
        ScrapeEvent::PdfSkipped { url, error } => serde_json::json!({
            "event": "warning", "stage": "extract_pdf", "url": url, "error": error
        }),
        ScrapeEvent::Published { bucket, key, bytes } => serde_json::json!({
            "event": "done", "stage": "publish", "bucket": bucket, "key": key, "bytes": bytes
        }),
        ScrapeEvent::Failed { error } => serde_json::json!({
            "event": "error", "error": error
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScrapeProgressReporter for NoProgress {
    fn report(&self, _event: ScrapeEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ScrapeProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
