//! # Page Harvest CLI (`harvest`)
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest scrape [URL]` | Scrape a page or PDF and upload the text |
//! | `harvest buckets` | List buckets visible to the AWS credentials |
//! | `harvest key <URL>` | Print the object key a scrape would use |
//! | `harvest init` | Write an example config file |
//! | `harvest completions <shell>` | Print shell completions |

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use page_harvest::config::{self, EXAMPLE_CONFIG};
use page_harvest::progress::ProgressMode;
use page_harvest::storage::S3Store;
use page_harvest::{buckets, pipeline, publish};

/// Scrape web pages and PDFs into an S3 bucket.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Scrape web pages and PDFs into an S3 bucket",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/harvest.toml`. A missing file means built-in
    /// defaults.
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a page (or PDF) and upload its text.
    ///
    /// Prompts for the URL when it is omitted. The bucket comes from
    /// `--bucket`, then `storage.bucket`, then an interactive choice.
    Scrape {
        /// Page or PDF to scrape.
        url: Option<String>,

        /// Destination bucket.
        #[arg(long)]
        bucket: Option<String>,

        /// Print the key and the text instead of uploading.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr. Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// List buckets visible to the configured credentials.
    Buckets,

    /// Print the object key a scrape of URL would be stored under.
    Key {
        url: String,

        /// Date to use instead of today (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Write a commented example config to the `--config` path.
    Init,

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    // Commands that don't read the config file
    match &cli.command {
        Commands::Init => {
            write_example_config(&cli.config)?;
            println!("Wrote example config to {}", cli.config.display());
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "harvest", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Key { url, date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let now = date.and_hms_opt(0, 0, 0).context("invalid date")?;
            println!("{}", publish::storage_key(url, now));
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Scrape {
            url,
            bucket,
            dry_run,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            pipeline::run_scrape(&cfg, url, bucket, dry_run, mode).await?;
        }
        Commands::Buckets => {
            let store = S3Store::from_env(&cfg.storage, &cfg.http)?;
            buckets::run_buckets(&store).await?;
        }
        Commands::Init | Commands::Completions { .. } | Commands::Key { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn write_example_config(path: &std::path::Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists; not overwriting", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
