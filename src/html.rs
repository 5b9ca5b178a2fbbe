//! HTML stages of the pipeline: body extraction, text normalization, and
//! PDF link discovery.
//!
//! All three are pure functions over markup strings; none of them fail.
//! Malformed markup degrades to an empty [`BodyFragment`], an empty
//! [`CleanedText`], or an empty link list.

use regex::Regex;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::models::{BodyFragment, CleanedText};

/// Spans whose contents are never markup: comments, scripts, and styles.
/// Unterminated spans run to the end of input.
const OPAQUE_SPANS: &str = r"<!--.*?(?:-->|\z)|<script\b.*?(?:</script\s*>|\z)|<style\b.*?(?:</style\s*>|\z)";

static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?is){}|<body(?:\s[^>]*)?/?>", OPAQUE_SPANS))
        .expect("body open pattern is valid")
});

static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?is){}|</body\s*>", OPAQUE_SPANS))
        .expect("body close pattern is valid")
});

static ANCHOR_WITH_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Isolate the `<body>` element of a page.
///
/// Returns the span of the original markup from the body open tag through
/// the last body close tag (or the end of input when the close tag is
/// missing). Tags inside comments, scripts, and styles are not body tags.
/// Pages without a body tag yield an empty fragment.
pub fn extract_body(markup: &str) -> BodyFragment {
    let Some(open) = BODY_OPEN
        .find_iter(markup)
        .find(|m| is_tag(m.as_str(), "<body"))
    else {
        return BodyFragment::empty();
    };

    let end = BODY_CLOSE
        .find_iter(&markup[open.end()..])
        .filter(|m| is_tag(m.as_str(), "</body"))
        .last()
        .map(|close| open.end() + close.end())
        .unwrap_or(markup.len());

    BodyFragment::new(&markup[open.start()..end])
}

fn is_tag(span: &str, prefix: &str) -> bool {
    span.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Visible text of a body fragment, one trimmed line per entry.
///
/// `<script>` and `<style>` subtrees are dropped, every remaining text node
/// starts a new line, comments are ignored, and blank lines are discarded.
pub fn normalize(body: &BodyFragment) -> CleanedText {
    if body.is_empty() {
        return CleanedText::default();
    }

    let document = Html::parse_document(body.as_str());
    let texts = document.root_element().descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if hidden {
            None
        } else {
            Some(&**text)
        }
    });

    CleanedText::from_lines(texts)
}

/// Find every anchor whose target is a PDF, resolved to an absolute URL.
///
/// Relative references are joined against `base_url`; absolute references
/// are returned exactly as written. Order follows the document. Repeated
/// links are kept unless `dedupe` is set, in which case the first
/// occurrence wins.
pub fn discover_pdf_links(markup: &str, base_url: &str, dedupe: bool) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let document = Html::parse_document(markup);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&ANCHOR_WITH_HREF) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !has_pdf_extension(href) {
            continue;
        }
        let Some(resolved) = resolve_reference(href, base.as_ref()) else {
            continue;
        };
        if dedupe && !seen.insert(resolved.clone()) {
            continue;
        }
        links.push(resolved);
    }
    links
}

/// Resolve an `href` against an optional base URL.
///
/// References that already carry a scheme pass through unchanged. Without
/// a base, scheme-less references get `http://`.
pub fn resolve_reference(href: &str, base: Option<&Url>) -> Option<String> {
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Some(format!("http://{}", href)),
    }
}

/// Prefix `http://` unless the reference already starts with an HTTP scheme.
pub fn ensure_http_scheme(reference: &str) -> String {
    let trimmed = reference.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Whether the path of a reference ends in `.pdf` (query and fragment ignored).
pub fn has_pdf_extension(reference: &str) -> bool {
    let path = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    path.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html>\n<html><head><title>T</title>\
        <style>body { color: red }</style></head>\
        <body class=\"main\">\n  <h1>Annual   Report</h1>\n\
        <script>var x = 1;</script>\n<p>First line<br>second line</p>\
        <!-- hidden note -->\n<div>   </div>\n</body></html>";

    #[test]
    fn extract_body_is_substring_with_boundaries() {
        let body = extract_body(PAGE);
        assert!(PAGE.contains(body.as_str()));
        assert!(body.len() < PAGE.len());
        assert!(body.as_str().starts_with("<body class=\"main\">"));
        assert!(body.as_str().ends_with("</body>"));
    }

    #[test]
    fn extract_body_is_case_insensitive() {
        let body = extract_body("<HTML><BODY>x</BODY></HTML>");
        assert_eq!(body.as_str(), "<BODY>x</BODY>");
    }

    #[test]
    fn extract_body_without_close_runs_to_end() {
        let body = extract_body("<html><body><p>open ended");
        assert_eq!(body.as_str(), "<body><p>open ended");
    }

    #[test]
    fn extract_body_missing_is_empty() {
        assert!(extract_body("<html><head></head></html>").is_empty());
        assert!(extract_body("").is_empty());
        // <bodyguard> is not a body tag.
        assert!(extract_body("<bodyguard>x</bodyguard>").is_empty());
    }

    #[test]
    fn normalize_strips_scripts_styles_and_comments() {
        let cleaned = normalize(&extract_body(PAGE));
        assert_eq!(
            cleaned.lines(),
            &[
                "Annual   Report".to_string(),
                "First line".to_string(),
                "second line".to_string(),
            ]
        );
        assert!(!cleaned.to_text().contains("var x"));
        assert!(!cleaned.to_text().contains("hidden note"));
    }

    #[test]
    fn normalize_has_no_blank_lines() {
        let cleaned = normalize(&BodyFragment::new(
            "<body><p>a</p>\n\n\t\n<p>  b  </p>\n   \n</body>",
        ));
        for line in cleaned.to_text().lines() {
            assert!(!line.trim().is_empty());
            assert_eq!(line, line.trim());
        }
        assert_eq!(cleaned.to_text(), "a\nb");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(&extract_body(PAGE));
        let twice = normalize(&BodyFragment::from(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_is_idempotent_for_escaped_markup() {
        let body = extract_body(
            "<body><p>&lt;b&gt;bold&lt;/b&gt; and &lt;script&gt;x()&lt;/script&gt;</p>\
             <p>fish &amp;amp; chips</p></body>",
        );
        let once = normalize(&body);
        assert_eq!(
            once.lines(),
            &[
                "<b>bold</b> and <script>x()</script>".to_string(),
                "fish &amp; chips".to_string(),
            ]
        );
        let twice = normalize(&BodyFragment::from(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn body_tag_inside_head_comment_is_ignored() {
        let markup = "<html><head><!-- <body> --></head><body>real</body></html>";
        let body = extract_body(markup);
        assert_eq!(body.as_str(), "<body>real</body>");
        assert_eq!(normalize(&body).to_text(), "real");
    }

    #[test]
    fn body_tag_inside_head_script_is_ignored() {
        let markup = "<html><head><script>var s = \"<body>\";</script>\
            <style>/* </body> */</style></head><body><p>real</p></body></html>";
        let body = extract_body(markup);
        assert!(markup.contains(body.as_str()));
        assert_eq!(body.as_str(), "<body><p>real</p></body>");
        assert_eq!(normalize(&body).to_text(), "real");
    }

    #[test]
    fn close_tag_inside_body_script_is_ignored() {
        let markup = "<body><p>a</p><script>w(\"</body>\")</script><p>b</p></body>\
            <!-- </body> -->";
        let body = extract_body(markup);
        assert!(body.as_str().ends_with("<p>b</p></body>"));
        assert_eq!(normalize(&body).to_text(), "a\nb");
    }

    #[test]
    fn normalize_empty_body() {
        assert!(normalize(&BodyFragment::empty()).is_empty());
    }

    #[test]
    fn relative_pdf_link_joins_base() {
        let links = discover_pdf_links(
            r#"<a href="report.pdf">Report</a>"#,
            "http://example.com/docs/",
            false,
        );
        assert_eq!(links, vec!["http://example.com/docs/report.pdf"]);
    }

    #[test]
    fn absolute_pdf_link_unchanged() {
        let links = discover_pdf_links(
            r#"<a href="http://other.com/x.pdf">X</a>"#,
            "http://example.com/docs/",
            false,
        );
        assert_eq!(links, vec!["http://other.com/x.pdf"]);
    }

    #[test]
    fn non_pdf_and_hrefless_anchors_ignored() {
        let markup = r#"<a href="/index.html">i</a><a name="top">t</a>
            <a href="/files/a.pdf?download=1">a</a><a href="B.PDF">b</a>"#;
        let links = discover_pdf_links(markup, "https://example.com/x/", false);
        assert_eq!(
            links,
            vec![
                "https://example.com/files/a.pdf?download=1",
                "https://example.com/x/B.PDF",
            ]
        );
    }

    #[test]
    fn duplicates_kept_in_document_order() {
        let markup = r#"<a href="b.pdf">1</a><a href="a.pdf">2</a><a href="b.pdf">3</a>"#;
        let links = discover_pdf_links(markup, "http://h.com/", false);
        assert_eq!(
            links,
            vec!["http://h.com/b.pdf", "http://h.com/a.pdf", "http://h.com/b.pdf"]
        );
        let deduped = discover_pdf_links(markup, "http://h.com/", true);
        assert_eq!(deduped, vec!["http://h.com/b.pdf", "http://h.com/a.pdf"]);
    }

    #[test]
    fn scheme_less_reference_without_base_gets_http() {
        assert_eq!(
            resolve_reference("www.example.com/a.pdf", None).as_deref(),
            Some("http://www.example.com/a.pdf")
        );
    }

    #[test]
    fn protocol_relative_reference_uses_base_scheme() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            resolve_reference("//cdn.example.com/a.pdf", Some(&base)).as_deref(),
            Some("https://cdn.example.com/a.pdf")
        );
    }

    #[test]
    fn ensure_http_scheme_prefixes_bare_hosts() {
        assert_eq!(ensure_http_scheme("example.com/a.pdf"), "http://example.com/a.pdf");
        assert_eq!(ensure_http_scheme(" https://example.com "), "https://example.com");
        assert_eq!(ensure_http_scheme("HTTP://example.com"), "HTTP://example.com");
    }
}
