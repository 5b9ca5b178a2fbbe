//! Core data models that flow through the scrape pipeline.
//!
//! ```text
//! PageDocument ─▶ BodyFragment ─▶ CleanedText ─┐
//!      │                                        ├─▶ AggregatedContent ─▶ StorageKey
//!      └─▶ pdf links ─▶ PdfResource ─▶ text ───┘
//! ```

use chrono::NaiveDate;

/// Rendered markup of a page, as captured by the navigator.
#[derive(Debug, Clone)]
pub struct PageDocument {
    /// URL the page was loaded from; base for resolving relative links.
    pub url: String,
    pub markup: String,
}

/// The `<body>` subtree of a [`PageDocument`], empty when the page had none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyFragment(String);

impl BodyFragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&CleanedText> for BodyFragment {
    /// Re-wrap cleaned text as a body whose only content is that text.
    /// Markup characters are escaped so they read back as text.
    fn from(cleaned: &CleanedText) -> Self {
        let mut html = String::from("<body>");
        for (i, line) in cleaned.lines().iter().enumerate() {
            if i > 0 {
                html.push('\n');
            }
            escape_text_into(line, &mut html);
        }
        html.push_str("</body>");
        Self(html)
    }
}

fn escape_text_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Visible page text: non-empty, trimmed lines in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanedText {
    lines: Vec<String>,
}

impl CleanedText {
    /// Build from arbitrary text, keeping only trimmed non-blank lines.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let lines = lines
            .into_iter()
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`, no trailing newline.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A downloaded PDF.
#[derive(Debug, Clone)]
pub struct PdfResource {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// The blob that gets published: page text followed by labeled PDF blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregatedContent {
    text: String,
    pdf_sources: Vec<String>,
}

impl AggregatedContent {
    pub fn from_page(cleaned: &CleanedText) -> Self {
        Self {
            text: cleaned.to_text(),
            pdf_sources: Vec::new(),
        }
    }

    /// Content for a scrape whose target was itself a PDF: the raw text, unlabeled.
    pub fn from_pdf(url: &str, text: &str) -> Self {
        Self {
            text: text.to_string(),
            pdf_sources: vec![url.to_string()],
        }
    }

    /// Append a PDF block labeled with its source URL.
    pub fn push_pdf(&mut self, url: &str, text: &str) {
        self.text.push_str("\n\nPDF Content from ");
        self.text.push_str(url);
        self.text.push_str(":\n");
        self.text.push_str(text);
        self.pdf_sources.push(url.to_string());
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn pdf_sources(&self) -> &[String] {
        &self.pdf_sources
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

/// Object key under which a scrape is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey(String);

impl StorageKey {
    /// `Scrape <YYYY-MM-DD> - <sanitized>.txt`, where the URL loses its
    /// `https://`/`http://` prefix and every `/` becomes `_`.
    pub fn derive(url: &str, date: NaiveDate) -> Self {
        Self(format!(
            "Scrape {} - {}.txt",
            date.format("%Y-%m-%d"),
            sanitize_url(url)
        ))
    }

    /// Same key with a disambiguating suffix before the extension.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        match self.0.strip_suffix(".txt") {
            Some(stem) => Self(format!("{} ({}).txt", stem, suffix)),
            None => Self(format!("{} ({})", self.0, suffix)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_url(url: &str) -> String {
    url.replace("https://", "")
        .replace("http://", "")
        .replace('/', "_")
}
