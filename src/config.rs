//! Configuration types for jira-scrape

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Top-level scraper configuration
///
/// Every field has a default, so an empty JSON object is a valid configuration
/// that scrapes nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root URL of the tracker (default: "https://issues.apache.org/jira")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Project keys to scrape, processed in order
    #[serde(default)]
    pub projects: Vec<String>,

    /// Directory receiving one `<PROJECT>.jsonl` file per project (default: "./data")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory receiving one `<PROJECT>.json` checkpoint per project (default: "./checkpoints")
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    /// Issues requested per search page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Comments requested per comment page (default: 100)
    #[serde(default = "default_page_size")]
    pub comment_page_size: u32,

    /// Number of recently processed issue keys kept for resume dedup (default: 5000)
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,

    /// Timeout applied to each individual HTTP request (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Issue fields requested from the search endpoint
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            projects: Vec::new(),
            output_dir: default_output_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            page_size: default_page_size(),
            comment_page_size: default_page_size(),
            seen_capacity: default_seen_capacity(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            fields: default_fields(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline loop or misbehave
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base URL must not be empty", "base_url"));
        }
        if self.page_size == 0 {
            return Err(Error::config("must be greater than zero", "page_size"));
        }
        if self.comment_page_size == 0 {
            return Err(Error::config(
                "must be greater than zero",
                "comment_page_size",
            ));
        }
        if self.seen_capacity == 0 {
            return Err(Error::config("must be greater than zero", "seen_capacity"));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(Error::config(
                "base delay must not exceed max delay",
                "retry.base_delay",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "multiplier must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, the first one included (default: 5)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 2 seconds)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Upper bound for any single delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to computed delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

fn default_base_url() -> String {
    "https://issues.apache.org/jira".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./checkpoints")
}

fn default_page_size() -> u32 {
    100
}

fn default_seen_capacity() -> usize {
    5000
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    concat!("jira-scrape/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_fields() -> Vec<String> {
    [
        "summary",
        "status",
        "priority",
        "assignee",
        "labels",
        "reporter",
        "description",
        "issuetype",
        "project",
        "created",
        "updated",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
