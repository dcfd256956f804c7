//! # jira-scrape
//!
//! Resumable extraction of issue-tracker data into append-only JSON Lines.
//!
//! ## Design Philosophy
//!
//! jira-scrape is designed to be:
//! - **Resumable** - A per-project checkpoint is written after every exported issue
//! - **Resilient** - Transient HTTP failures are retried with capped exponential backoff
//! - **Append-only** - Output files are only ever appended to
//! - **Library-first** - The caller decides how configuration is loaded and when to run
//!
//! ## Quick Start
//!
//! ```no_run
//! use jira_scrape::{Config, Scraper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         projects: vec!["HADOOP".to_string(), "SPARK".to_string()],
//!         page_size: 50,
//!         ..Default::default()
//!     };
//!
//!     let scraper = Scraper::new(config)?;
//!     for (project, result) in scraper.run().await {
//!         match result {
//!             Ok(summary) => println!("{project}: {} issues exported", summary.exported),
//!             Err(e) => eprintln!("{project}: {e}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Durable per-project resume state
pub mod checkpoint;
/// HTTP client with retry/backoff
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Pagination driver
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// HTML to plain text
pub mod sanitize;
/// Append-only record output
pub mod sink;
/// Issue to record transformation
pub mod transform;
/// Remote page shapes and run summaries
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use checkpoint::{CheckpointState, CheckpointStore, SeenKeys};
pub use client::JiraClient;
pub use config::{Config, RetryConfig};
pub use error::{Error, Result};
pub use pipeline::{Scraper, build_jql};
pub use retry::{IsRetryable, Sleeper, TokioSleeper};
pub use sink::RecordSink;
pub use transform::{IssueRecord, transform_issue};
pub use types::{CommentPage, ScrapeSummary, SearchPage};
