use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Chromium/Chrome executable. Auto-detected from `PATH` when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_stable_polls")]
    pub stable_polls: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
            extra_args: Vec::new(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_timeout_secs: default_settle_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            stable_polls: default_stable_polls(),
        }
    }
}

fn default_headless() -> bool {
    true
}
fn default_navigation_timeout_secs() -> u64 {
    60
}
fn default_settle_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_stable_polls() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!("page-harvest/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PdfConfig {
    /// Drop repeated PDF links (first occurrence wins).
    #[serde(default)]
    pub dedupe_links: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// AWS region. Falls back to `AWS_REGION`, then `us-east-1`.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Default destination bucket.
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

impl StorageConfig {
    pub fn resolved_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string())
    }
}

/// What the publisher does when the storage key already exists.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Last writer wins.
    #[default]
    Overwrite,
    /// Keep the existing object and write under a time-suffixed key.
    Version,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Load the config file if present, otherwise fall back to built-in defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.browser.stable_polls == 0 {
        anyhow::bail!("browser.stable_polls must be >= 1");
    }

    if config.browser.poll_interval_ms == 0 {
        anyhow::bail!("browser.poll_interval_ms must be > 0");
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }

    if let Some(ref exe) = config.browser.executable {
        if exe.as_os_str().is_empty() {
            anyhow::bail!("browser.executable must not be empty when set");
        }
    }

    if let Some(ref endpoint) = config.storage.endpoint_url {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!(
                "storage.endpoint_url must start with http:// or https:// (got '{}')",
                endpoint
            );
        }
    }

    Ok(config)
}

/// Commented template written by `harvest init`.
pub const EXAMPLE_CONFIG: &str = r#"# page-harvest configuration

[browser]
# executable = "/usr/bin/chromium"
headless = true
extra_args = []
navigation_timeout_secs = 60
# Upper bound on waiting for the DOM to stop changing after load.
settle_timeout_secs = 10
poll_interval_ms = 250
stable_polls = 3

[http]
timeout_secs = 60

[pdf]
dedupe_links = false

[storage]
# region = "us-east-1"
# endpoint_url = "http://localhost:9000"   # MinIO / LocalStack
# bucket = "my-scrapes"
# "overwrite" replaces same-day scrapes of a URL; "version" keeps both.
on_conflict = "overwrite"
"#;
