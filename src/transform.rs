//! Issue + comments -> exported record
//!
//! Remote issues are read as loosely typed JSON. Every field access below has an explicit
//! default so an issue missing any of them still produces a record.

use crate::sanitize::to_plain_text_opt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exported line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Project key
    pub project: Option<String>,
    /// Issue key, e.g. `HADOOP-1234`
    pub issue_key: Option<String>,
    /// Flattened issue metadata
    pub metadata: IssueMetadata,
    /// Description as plain text
    pub description: String,
    /// Comment bodies as plain text, in fetch order
    pub comments: Vec<String>,
    /// Fields derived for downstream use
    pub derived: Derived,
}

/// Flattened scalar fields of an issue
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueMetadata {
    /// `fields.summary`
    pub title: Option<String>,
    /// `fields.status.name`
    pub status: Option<String>,
    /// `fields.priority.name`
    pub priority: Option<String>,
    /// `fields.assignee.displayName`
    pub assignee: Option<String>,
    /// `fields.labels`
    pub labels: Vec<String>,
    /// `fields.reporter.displayName`
    pub reporter: Option<String>,
    /// `fields.created`
    pub created: Option<String>,
    /// `fields.updated`
    pub updated: Option<String>,
    /// `fields.issuetype.name`
    pub issuetype: Option<String>,
    /// `fields.project.key`
    pub project: Option<String>,
    /// Issue key
    pub key: Option<String>,
}

/// Derived fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Derived {
    /// Label for status classification tasks
    pub classification_target: Option<String>,
}

/// Build the exported record for an issue and all of its comments
pub fn transform_issue(issue: &Value, comments: &[Value]) -> IssueRecord {
    let fields = issue.get("fields").unwrap_or(&Value::Null);

    let metadata = IssueMetadata {
        title: string_at(fields, &["summary"]),
        status: string_at(fields, &["status", "name"]),
        priority: string_at(fields, &["priority", "name"]),
        assignee: string_at(fields, &["assignee", "displayName"]),
        labels: fields
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        reporter: string_at(fields, &["reporter", "displayName"]),
        created: string_at(fields, &["created"]),
        updated: string_at(fields, &["updated"]),
        issuetype: string_at(fields, &["issuetype", "name"]),
        project: string_at(fields, &["project", "key"]).filter(|k| !k.is_empty()),
        key: string_at(issue, &["key"]),
    };

    IssueRecord {
        project: metadata.project.clone(),
        issue_key: metadata.key.clone(),
        description: to_plain_text_opt(fields.get("description").and_then(Value::as_str)),
        comments: comments
            .iter()
            .map(|c| to_plain_text_opt(c.get("body").and_then(Value::as_str)))
            .collect(),
        derived: Derived {
            classification_target: metadata.status.clone(),
        },
        metadata,
    }
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
