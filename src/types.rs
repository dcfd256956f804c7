//! Page shapes returned by the tracker and the per-project run summary

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of the issue search endpoint
///
/// Issues stay weakly typed; [`crate::transform`] reads them with explicit defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Offset of the first issue in this page
    #[serde(default)]
    pub start_at: u64,

    /// Page size the server actually applied
    #[serde(default)]
    pub max_results: u64,

    /// Total number of issues matching the query
    #[serde(default)]
    pub total: Option<u64>,

    /// Issues in query order
    #[serde(default)]
    pub issues: Vec<Value>,
}

/// One page of an issue's comment endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    /// Offset of the first comment in this page
    #[serde(default)]
    pub start_at: u64,

    /// Page size the server actually applied
    #[serde(default)]
    pub max_results: u64,

    /// Total number of comments on the issue
    #[serde(default)]
    pub total: Option<u64>,

    /// Comments in this page
    #[serde(default)]
    pub comments: Vec<Value>,
}

/// Outcome of scraping one project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    /// Project key
    pub project: String,

    /// Total reported by the first search page
    pub total_hint: Option<u64>,

    /// Search pages fetched, the terminating empty page included
    pub pages: u64,

    /// Records appended to the output
    pub exported: u64,

    /// Issues skipped because their key was already in the checkpoint
    pub skipped: u64,

    /// Comments fetched across all exported issues
    pub comments: u64,
}

/// Key of an issue, if present and a string
pub fn issue_key(issue: &Value) -> Option<&str> {
    issue.get("key").and_then(Value::as_str)
}

/// The `fields.updated` order value of an issue, if present
pub fn issue_updated(issue: &Value) -> Option<&str> {
    issue
        .get("fields")
        .and_then(|f| f.get("updated"))
        .and_then(Value::as_str)
}
