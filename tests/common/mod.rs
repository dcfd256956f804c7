//! Common test utilities for jira-scrape pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use jira_scrape::{CheckpointStore, Config, JiraClient, RecordSink, RetryConfig, Scraper, Sleeper};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Timestamps in ascending `updated` order
pub const I1_UPDATED: &str = "2024-01-01T10:00:00.000+0000";
pub const I2_UPDATED: &str = "2024-01-02T10:00:00.000+0000";
pub const I3_UPDATED: &str = "2024-01-03T10:00:00.000+0000";

/// Sleeper that records delays instead of waiting
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Config for `projects` against a mock server, all state under `root`
pub fn test_config(server: &MockServer, root: &Path, projects: &[&str]) -> Config {
    Config {
        base_url: server.uri(),
        projects: projects.iter().map(|p| p.to_string()).collect(),
        output_dir: root.join("data"),
        checkpoint_dir: root.join("checkpoints"),
        page_size: 2,
        comment_page_size: 2,
        seen_capacity: 100,
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

/// Scraper wired to a recording sleeper
pub fn build_scraper(config: Config, sleeper: &RecordingSleeper) -> Scraper {
    let client = JiraClient::new(&config)
        .unwrap()
        .with_sleeper(Arc::new(sleeper.clone()));
    let checkpoints = CheckpointStore::new(&config.checkpoint_dir, config.seen_capacity);
    let sink = RecordSink::new(&config.output_dir);
    Scraper::from_parts(config, client, checkpoints, sink)
}

/// A minimal issue as returned by the search endpoint
pub fn issue(key: &str, updated: &str) -> Value {
    let project = key.split('-').next().unwrap_or_default();
    json!({
        "key": key,
        "fields": {
            "summary": format!("Summary of {key}"),
            "status": {"name": "Open"},
            "description": format!("<p>Description of {key}</p>"),
            "project": {"key": project},
            "updated": updated
        }
    })
}

/// Mount a search page for `jql` at `start_at`
pub async fn mount_search(
    server: &MockServer,
    jql: &str,
    start_at: u64,
    issues: Vec<Value>,
    total: u64,
) {
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .and(query_param("jql", jql))
        .and(query_param("startAt", start_at.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": start_at,
            "maxResults": 2,
            "total": total,
            "issues": issues
        })))
        .mount(server)
        .await;
}

/// Mount a comment page for `key` at `start_at`; `total: None` omits the field
pub async fn mount_comments(
    server: &MockServer,
    key: &str,
    start_at: u64,
    bodies: &[&str],
    total: Option<u64>,
) {
    let comments: Vec<Value> = bodies.iter().map(|b| json!({"body": b})).collect();
    let mut body = json!({"startAt": start_at, "maxResults": 2, "comments": comments});
    if let Some(total) = total {
        body["total"] = json!(total);
    }

    Mock::given(method("GET"))
        .and(path(format!("/rest/api/2/issue/{key}/comment")))
        .and(query_param("startAt", start_at.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Parsed lines of an output file (empty if the file does not exist)
pub fn read_records(path: &Path) -> Vec<Value> {
    match std::fs::read_to_string(path) {
        Ok(raw) => raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Issue keys of the records in an output file
pub fn record_keys(path: &Path) -> Vec<String> {
    read_records(path)
        .iter()
        .map(|r| r["issue_key"].as_str().unwrap().to_string())
        .collect()
}
