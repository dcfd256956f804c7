//! Resumable paginated extraction of one or more projects
//!
//! For each project the driver:
//! 1. loads the checkpoint and builds a JQL query ordered by `updated` ascending, bounded
//!    below (inclusively) by the last persisted `updated` value
//! 2. walks the search result page by page
//! 3. for every issue not in the seen window, fetches all comments, transforms the issue,
//!    appends the record and persists the checkpoint before touching the next issue
//! 4. stops on an empty page or a page shorter than requested
//!
//! A crash between the append and the checkpoint write can duplicate at most one record on
//! the next run; nothing that was appended is ever lost from the resume position.

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::client::JiraClient;
use crate::config::Config;
use crate::error::Result;
use crate::sink::RecordSink;
use crate::transform::transform_issue;
use crate::types::{ScrapeSummary, issue_key, issue_updated};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Order field used for filtering, sorting and checkpointing
pub const ORDER_FIELD: &str = "updated";

/// Build the search query for a project, resuming from `last_seen` when present
///
/// The lower bound is inclusive; issues sharing the boundary value are filtered out by the
/// seen window instead.
pub fn build_jql(project: &str, last_seen: Option<&str>) -> String {
    let project = jql_quote(project);
    match last_seen {
        Some(value) => format!(
            "project = {project} AND {ORDER_FIELD} >= {} ORDER BY {ORDER_FIELD} ASC",
            jql_quote(value)
        ),
        None => format!("project = {project} ORDER BY {ORDER_FIELD} ASC"),
    }
}

/// Double-quoted JQL string literal with `\` and `"` escaped
fn jql_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// What a fetched page means for the pagination loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageKind {
    /// No issues: done
    Empty,
    /// Fewer issues than requested: process, then done
    Short,
    /// A full page: process, then fetch the next one
    Full,
}

impl PageKind {
    fn classify(returned: usize, requested: u32) -> Self {
        if returned == 0 {
            PageKind::Empty
        } else if returned < requested as usize {
            PageKind::Short
        } else {
            PageKind::Full
        }
    }
}

/// Drives extraction for the configured projects
#[derive(Debug)]
pub struct Scraper {
    config: Config,
    client: JiraClient,
    checkpoints: CheckpointStore,
    sink: RecordSink,
}

impl Scraper {
    /// Build a scraper with an HTTP client, checkpoint store and sink derived from `config`
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = JiraClient::new(&config)?;
        let checkpoints = CheckpointStore::new(&config.checkpoint_dir, config.seen_capacity);
        let sink = RecordSink::new(&config.output_dir);
        Ok(Self::from_parts(config, client, checkpoints, sink))
    }

    /// Assemble a scraper from already-built components
    pub fn from_parts(
        config: Config,
        client: JiraClient,
        checkpoints: CheckpointStore,
        sink: RecordSink,
    ) -> Self {
        Self {
            config,
            client,
            checkpoints,
            sink,
        }
    }

    /// Scrape every configured project in order
    ///
    /// A failing project is logged and reported in its slot; the remaining projects still
    /// run.
    pub async fn run(&self) -> Vec<(String, Result<ScrapeSummary>)> {
        let mut results = Vec::with_capacity(self.config.projects.len());

        for project in &self.config.projects {
            let result = self.scrape_project(project).await;
            match &result {
                Ok(summary) => info!(
                    project = %project,
                    exported = summary.exported,
                    skipped = summary.skipped,
                    pages = summary.pages,
                    "project complete"
                ),
                Err(e) => error!(project = %project, error = %e, "project aborted"),
            }
            results.push((project.clone(), result));
        }

        results
    }

    /// Scrape one project from its checkpoint to the end of the result set
    pub async fn scrape_project(&self, project: &str) -> Result<ScrapeSummary> {
        let mut state = self.checkpoints.load(project).await;
        let jql = build_jql(project, state.last_seen_order_value.as_deref());

        info!(
            project,
            jql = %jql,
            resume_from = ?state.last_seen_order_value,
            seen = state.seen_keys.len(),
            "starting project"
        );

        let mut summary = ScrapeSummary {
            project: project.to_string(),
            ..ScrapeSummary::default()
        };
        let mut start_at: u64 = 0;

        loop {
            let page = self
                .client
                .search_issues(&jql, start_at, self.config.page_size, &self.config.fields)
                .await?;
            summary.pages += 1;
            if summary.total_hint.is_none() {
                summary.total_hint = page.total;
            }

            let returned = page.issues.len();
            let kind = PageKind::classify(returned, self.config.page_size);
            if kind == PageKind::Empty {
                debug!(project, start_at, "empty page, done");
                break;
            }

            for issue in &page.issues {
                self.process_issue(project, issue, &mut state, &mut summary)
                    .await?;
            }

            info!(
                project,
                start_at,
                returned,
                exported = summary.exported,
                skipped = summary.skipped,
                total = ?summary.total_hint,
                "page processed"
            );

            if kind == PageKind::Short {
                break;
            }
            start_at += returned as u64;
        }

        Ok(summary)
    }

    async fn process_issue(
        &self,
        project: &str,
        issue: &Value,
        state: &mut CheckpointState,
        summary: &mut ScrapeSummary,
    ) -> Result<()> {
        let Some(key) = issue_key(issue) else {
            warn!(project, "issue without key, skipping");
            summary.skipped += 1;
            return Ok(());
        };

        if state.is_seen(key) {
            debug!(project, key, "already exported, skipping");
            summary.skipped += 1;
            return Ok(());
        }

        let comments = self.fetch_all_comments(key).await?;
        let record = transform_issue(issue, &comments);
        self.sink
            .append(project, std::slice::from_ref(&record))
            .await?;

        state.mark_seen(key);
        state.advance(issue_updated(issue));
        self.checkpoints.save(project, state).await?;

        summary.exported += 1;
        summary.comments += comments.len() as u64;
        debug!(project, key, comments = comments.len(), "issue exported");
        Ok(())
    }

    /// Fetch every comment of an issue
    ///
    /// Stops on an empty page, or once the reported total has been reached. A missing or
    /// zero total means "until an empty page".
    pub async fn fetch_all_comments(&self, issue_key: &str) -> Result<Vec<Value>> {
        let mut comments = Vec::new();
        let mut start_at: u64 = 0;

        loop {
            let page = self
                .client
                .get_issue_comments(issue_key, start_at, self.config.comment_page_size)
                .await?;
            if page.comments.is_empty() {
                break;
            }

            start_at += page.comments.len() as u64;
            comments.extend(page.comments);

            if let Some(total) = page.total.filter(|t| *t > 0) {
                if start_at >= total {
                    break;
                }
            }
        }

        Ok(comments)
    }
}
