//! Amazon S3 object store.
//!
//! Lists buckets, probes keys, and uploads objects through the S3 REST API
//! with AWS Signature V4 authentication. Supports custom endpoints for
//! S3-compatible services (MinIO, LocalStack), which are addressed
//! path-style (`<endpoint>/<bucket>/<key>`); AWS itself is addressed
//! virtual-host style (`<bucket>.s3.<region>.amazonaws.com/<key>`), except
//! for bucket names containing dots, which go path-style.
//!
//! Signing uses only pure-Rust dependencies (`hmac`, `sha2`).
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! region = "us-east-1"
//! bucket = "my-scrapes"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, for temporary credentials)
//! - `AWS_REGION` (used when `storage.region` is unset)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::{HttpConfig, StorageConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::traits::ObjectStore;

type HmacSha256 = Hmac<Sha256>;

// ============ AWS Credentials ============

/// AWS credentials loaded from environment variables.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> ScrapeResult<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            ScrapeError::Config("AWS_ACCESS_KEY_ID environment variable not set".to_string())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ScrapeError::Config("AWS_SECRET_ACCESS_KEY environment variable not set".to_string())
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self::new(access_key_id, secret_access_key, session_token))
    }
}

// ============ S3 Store ============

/// [`ObjectStore`] implementation for S3 and S3-compatible services.
pub struct S3Store {
    client: reqwest::Client,
    creds: AwsCredentials,
    region: String,
    endpoint_url: Option<String>,
}

/// Where a request goes and what gets signed.
struct Target {
    url: String,
    host: String,
    canonical_uri: String,
}

impl S3Store {
    pub fn new(
        storage: &StorageConfig,
        http: &HttpConfig,
        creds: AwsCredentials,
    ) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            creds,
            region: storage.resolved_region(),
            endpoint_url: storage
                .endpoint_url
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
        })
    }

    /// Build a store using credentials from the environment.
    pub fn from_env(storage: &StorageConfig, http: &HttpConfig) -> ScrapeResult<Self> {
        Self::new(storage, http, AwsCredentials::from_env()?)
    }

    fn target(&self, bucket: Option<&str>, key: Option<&str>) -> Target {
        let encoded_key = key.map(|k| k.split('/').map(uri_encode).collect::<Vec<_>>().join("/"));

        match (&self.endpoint_url, bucket) {
            (Some(endpoint), _) => {
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string();
                let mut canonical_uri = String::from("/");
                if let Some(bucket) = bucket {
                    canonical_uri.push_str(&uri_encode(bucket));
                    if let Some(ref k) = encoded_key {
                        canonical_uri.push('/');
                        canonical_uri.push_str(k);
                    }
                }
                Target {
                    url: format!("{}{}", endpoint, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            // Dotted names break the `*.s3.<region>.amazonaws.com` certificate.
            (None, Some(bucket)) if bucket.contains('.') => {
                let host = format!("s3.{}.amazonaws.com", self.region);
                let mut canonical_uri = format!("/{}", uri_encode(bucket));
                if let Some(ref k) = encoded_key {
                    canonical_uri.push('/');
                    canonical_uri.push_str(k);
                }
                Target {
                    url: format!("https://{}{}", host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            (None, Some(bucket)) => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let canonical_uri = format!("/{}", encoded_key.unwrap_or_default());
                Target {
                    url: format!("https://{}{}", host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            (None, None) => {
                let host = format!("s3.{}.amazonaws.com", self.region);
                Target {
                    url: format!("https://{}/", host),
                    host,
                    canonical_uri: "/".to_string(),
                }
            }
        }
    }

    fn signed(
        &self,
        method: reqwest::Method,
        target: &Target,
        payload: &[u8],
    ) -> reqwest::RequestBuilder {
        let payload_hash = hex_sha256(payload);
        let now = Utc::now();
        let authorization = sign_request(
            &self.creds,
            &self.region,
            method.as_str(),
            &target.host,
            &target.canonical_uri,
            "",
            &[],
            &payload_hash,
            now,
        );

        let mut req = self
            .client
            .request(method, &target.url)
            .header("Authorization", authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", amz_date(now));

        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }
        req
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> ScrapeResult<Vec<String>> {
        let target = self.target(None, None);
        let resp = self
            .signed(reqwest::Method::GET, &target, b"")
            .send()
            .await
            .map_err(|e| ScrapeError::storage("*", format!("ListBuckets request failed: {}", e)))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ScrapeError::storage(
                "*",
                format!("ListBuckets failed (HTTP {}): {}", status, describe_s3_error(&body)),
            ));
        }

        parse_bucket_names(&body)
            .map_err(|e| ScrapeError::storage("*", format!("invalid ListBuckets response: {}", e)))
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> ScrapeResult<bool> {
        let target = self.target(Some(bucket), Some(key));
        let resp = self
            .signed(reqwest::Method::HEAD, &target, b"")
            .send()
            .await
            .map_err(|e| ScrapeError::storage(bucket, format!("HeadObject request failed: {}", e)))?;

        match resp.status().as_u16() {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(ScrapeError::storage(
                bucket,
                format!("HeadObject failed (HTTP {}) for key '{}'", resp.status(), key),
            )),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> ScrapeResult<()> {
        let target = self.target(Some(bucket), Some(key));
        let resp = self
            .signed(reqwest::Method::PUT, &target, &body)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| ScrapeError::storage(bucket, format!("PutObject request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::storage(
                bucket,
                format!("PutObject failed (HTTP {}): {}", status, describe_s3_error(&text)),
            ));
        }
        Ok(())
    }
}

// ============ AWS SigV4 Helpers ============

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Build the SigV4 `Authorization` header value for an S3 request.
///
/// Always signs `host`, `x-amz-content-sha256`, `x-amz-date` and, when
/// present, `x-amz-security-token`; `extra_headers` are signed as given
/// (names must be lowercase).
#[allow(clippy::too_many_arguments)]
fn sign_request(
    creds: &AwsCredentials,
    region: &str,
    method: &str,
    host: &str,
    canonical_uri: &str,
    canonical_querystring: &str,
    extra_headers: &[(&str, &str)],
    payload_hash: &str,
    now: DateTime<Utc>,
) -> String {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = amz_date(now);

    let mut headers = vec![
        ("host".to_string(), host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    for (k, v) in extra_headers {
        headers.push((k.to_string(), v.trim().to_string()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        canonical_uri,
        canonical_querystring,
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, "s3");
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, credential_scope, signed_headers, signature
    )
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986, leaving only `A-Z a-z 0-9 - _ . ~`.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

// ============ XML Parsing ============

/// Text content of every `<tag>` element, optionally only those nested in `<parent>`.
fn collect_element_text(
    xml: &str,
    parent: Option<&[u8]>,
    tag: &[u8],
) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut values = Vec::new();
    let mut parent_depth = 0usize;
    let mut in_tag = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                if Some(name.as_ref()) == parent {
                    parent_depth += 1;
                } else if name.as_ref() == tag && (parent.is_none() || parent_depth > 0) {
                    in_tag = true;
                }
            }
            Event::Text(t) if in_tag => {
                values.push(t.unescape()?.into_owned());
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == tag {
                    in_tag = false;
                } else if Some(name.as_ref()) == parent {
                    parent_depth = parent_depth.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(values)
}

/// Parse a `ListAllMyBucketsResult` document into bucket names.
fn parse_bucket_names(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    collect_element_text(xml, Some(b"Bucket".as_slice()), b"Name")
}

/// Render an S3 `<Error>` body as `Code: Message`, or a truncated raw body.
fn describe_s3_error(body: &str) -> String {
    let first = |tag: &[u8]| {
        collect_element_text(body, Some(b"Error".as_slice()), tag)
            .ok()
            .and_then(|v| v.into_iter().next())
    };
    match (first(b"Code".as_slice()), first(b"Message".as_slice())) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code,
        _ => body.chars().take(500).collect(),
    }
}
