//! # Page Harvest
//!
//! Scrape a web page (or a PDF) and file its text in an S3 bucket.
//!
//! A headless Chromium renders the page, the `<body>` is reduced to its
//! visible text, every linked PDF is downloaded and appended, and the result
//! is written to the bucket as one plain-text object named after the date
//! and the URL.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────────┐   ┌──────────┐
//! │ Chromium │──▶│ body ▶ text ▶ PDF text │──▶│ S3 / S3- │
//! │  (CDP)   │   │   aggregate into blob  │   │ compat.  │
//! └──────────┘   └────────────────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest init                                  # write ./config/harvest.toml
//! harvest buckets                               # list destination buckets
//! harvest scrape https://example.com/page       # scrape and upload
//! harvest scrape https://example.com/a.pdf --dry-run
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Data types passed between stages |
//! | [`traits`] | `PageSource` and `ObjectStore` seams |
//! | [`browser`] | Chromium navigator |
//! | [`html`] | Body extraction, normalization, PDF link discovery |
//! | [`pdf`] | PDF download and text extraction |
//! | [`publish`] | Storage key derivation and upload |
//! | [`storage`] | S3 client with SigV4 signing |
//! | [`pipeline`] | Stage orchestration |
//! | [`buckets`] | Bucket listing and selection |
//! | [`prompt`] | Interactive input |
//! | [`progress`] | Stage progress on stderr |

pub mod browser;
pub mod buckets;
pub mod config;
pub mod error;
pub mod html;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod publish;
pub mod storage;
pub mod traits;
