//! Append-only JSON Lines output, one file per project

use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Writes records to `<dir>/<PROJECT>.jsonl`
///
/// Existing content is never rewritten. Duplicate records at resume boundaries are
/// expected and left for downstream consumers to collapse by key.
#[derive(Clone, Debug)]
pub struct RecordSink {
    dir: PathBuf,
}

impl RecordSink {
    /// Sink rooted at `dir` (created on first append)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output file for a project
    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.jsonl"))
    }

    /// Append records, one JSON document per line, and sync them to disk
    ///
    /// All records are serialized before the file is touched, so a serialization failure
    /// writes nothing.
    pub async fn append<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(collection))
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await?;

        tracing::debug!(collection, records = records.len(), bytes = buf.len(), "appended records");
        Ok(())
    }
}
