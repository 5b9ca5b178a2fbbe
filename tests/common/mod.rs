//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use page_harvest::error::{ScrapeError, ScrapeResult};
use page_harvest::models::PageDocument;
use page_harvest::progress::{ScrapeEvent, ScrapeProgressReporter};
use page_harvest::traits::{ObjectStore, PageSource};

/// Minimal valid PDF with one page per entry, each showing its phrase.
/// Builds the body first, then an xref with correct byte offsets so
/// pdf-extract can parse it.
pub fn pdf_with_pages(phrases: &[&str]) -> Vec<u8> {
    let n = phrases.len();
    let font_id = 3;
    let first_page_id = 4;

    let kids: Vec<String> = (0..n)
        .map(|i| format!("{} 0 R", first_page_id + 2 * i))
        .collect();

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n).into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
    ];
    for (i, phrase) in phrases.iter().enumerate() {
        let contents_id = first_page_id + 2 * i + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R \
                 /Resources << /Font << /F1 {} 0 R >> >> >>",
                contents_id, font_id
            )
            .into_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        objects.push(
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            )
            .into_bytes(),
        );
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj ", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b" endobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// Serve `app` on an ephemeral localhost port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Page source that returns fixed markup and counts how often it was asked.
pub struct ScriptedPage {
    markup: String,
    calls: AtomicUsize,
}

impl ScriptedPage {
    pub fn new(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for ScriptedPage {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(&self, url: &str) -> ScrapeResult<PageDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PageDocument {
            url: url.to_string(),
            markup: self.markup.clone(),
        })
    }
}

/// Page source whose browser never starts.
pub struct UnreachablePage;

#[async_trait]
impl PageSource for UnreachablePage {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn fetch_page(&self, url: &str) -> ScrapeResult<PageDocument> {
        Err(ScrapeError::navigation(url, "browser failed to start"))
    }
}

/// Buckets held in memory. Writes to unknown buckets fail like S3 does.
pub struct MemoryStore {
    buckets: Vec<String>,
    objects: Mutex<BTreeMap<(String, String), (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn with_buckets(buckets: &[&str]) -> Self {
        Self {
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(body, _)| String::from_utf8(body.clone()).unwrap())
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(_, ct)| ct.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap();
        objects.keys().map(|(_, k)| k.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> ScrapeResult<Vec<String>> {
        Ok(self.buckets.clone())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> ScrapeResult<bool> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> ScrapeResult<()> {
        if !self.buckets.iter().any(|b| b == bucket) {
            return Err(ScrapeError::storage(bucket, "NoSuchBucket"));
        }
        let mut objects = self.objects.lock().unwrap();
        objects.insert(
            (bucket.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
        Ok(())
    }
}

/// Progress reporter that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ScrapeEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ScrapeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ScrapeProgressReporter for RecordingProgress {
    fn report(&self, event: ScrapeEvent) {
        self.events.lock().unwrap().push(event);
    }
}
