//! Shared test helpers: a simulated clock and a ready-made test configuration.

use crate::config::{Config, RetryConfig};
use crate::retry::Sleeper;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleeper that records requested delays and returns immediately.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Config pointing at `base_url` with all state under `root`.
pub(crate) fn test_config(base_url: &str, root: &std::path::Path) -> Config {
    Config {
        base_url: base_url.to_string(),
        output_dir: root.join("data"),
        checkpoint_dir: root.join("checkpoints"),
        request_timeout: Duration::from_secs(5),
        retry: RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}
