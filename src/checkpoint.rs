//! Durable per-project resume state
//!
//! Each project owns one JSON file `<checkpoint_dir>/<PROJECT>.json`:
//!
//! ```json
//! {
//!   "last_seen_order_value": "2024-01-02T03:04:05.000+0000",
//!   "seen_keys": ["ABC-1", "ABC-2"]
//! }
//! ```
//!
//! Writes go to a temporary file that is synced and then renamed over the target, so a
//! reader only ever observes a fully written state. A missing or unreadable file loads
//! as an empty state rather than failing the run.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Bounded insertion-ordered set of issue keys
///
/// Oldest entries are evicted first once `capacity` is exceeded. Re-inserting a key that
/// is already present does not refresh its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeenKeys {
    order: VecDeque<String>,
    index: HashSet<String>,
    capacity: usize,
}

impl SeenKeys {
    /// Empty set holding at most `capacity` keys (a zero capacity is treated as one)
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            index: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Build from keys ordered oldest first, keeping only the newest `capacity`
    pub fn from_keys<I>(keys: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = Self::new(capacity);
        for key in keys {
            set.insert(key);
        }
        set
    }

    /// Insert a key, evicting the oldest ones past capacity. Returns false if already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.index.contains(&key) {
            return false;
        }
        self.index.insert(key.clone());
        self.order.push_back(key);

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }

    /// Whether `key` is in the window
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no key is held
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of keys held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Resume state of one project
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointState {
    /// Highest order-field value fully processed so far
    pub last_seen_order_value: Option<String>,
    /// Recently processed issue keys
    pub seen_keys: SeenKeys,
}

impl CheckpointState {
    /// Fresh state for a project that was never scraped
    pub fn empty(capacity: usize) -> Self {
        Self {
            last_seen_order_value: None,
            seen_keys: SeenKeys::new(capacity),
        }
    }

    /// Whether an issue key was already processed
    pub fn is_seen(&self, key: &str) -> bool {
        self.seen_keys.contains(key)
    }

    /// Record an issue key as processed
    pub fn mark_seen(&mut self, key: impl Into<String>) -> bool {
        self.seen_keys.insert(key)
    }

    /// Move the order value forward
    ///
    /// `None` keeps the previous value. A value that sorts before the current one is
    /// ignored so the stored lower bound never moves backwards.
    pub fn advance(&mut self, order_value: Option<&str>) {
        let Some(candidate) = order_value else {
            return;
        };
        if let Some(current) = self.last_seen_order_value.as_deref() {
            if candidate < current {
                debug!(current, candidate, "ignoring order value that moves backwards");
                return;
            }
        }
        self.last_seen_order_value = Some(candidate.to_string());
    }
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCheckpoint {
    #[serde(default)]
    last_seen_order_value: Option<String>,
    /// Older files name the order value this way; read only
    #[serde(default, skip_serializing)]
    last_updated_iso: Option<String>,
    #[serde(default)]
    seen_keys: Vec<String>,
}

/// File-backed checkpoint store, one file per project
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
    capacity: usize,
}

impl CheckpointStore {
    /// Store rooted at `dir` keeping at most `capacity` seen keys per project
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
        }
    }

    /// Checkpoint file for a project
    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    fn temp_path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!(".{collection}.json.tmp"))
    }

    /// Load a project's state; absent or corrupt files yield an empty state
    pub async fn load(&self, collection: &str) -> CheckpointState {
        let path = self.path_for(collection);

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(collection, path = %path.display(), "no checkpoint, starting fresh");
                return CheckpointState::empty(self.capacity);
            }
            Err(e) => {
                warn!(collection, path = %path.display(), error = %e, "unreadable checkpoint, starting fresh");
                return CheckpointState::empty(self.capacity);
            }
        };

        match serde_json::from_slice::<StoredCheckpoint>(&raw) {
            Ok(stored) => CheckpointState {
                last_seen_order_value: stored
                    .last_seen_order_value
                    .or(stored.last_updated_iso),
                seen_keys: SeenKeys::from_keys(stored.seen_keys, self.capacity),
            },
            Err(e) => {
                warn!(collection, path = %path.display(), error = %e, "corrupt checkpoint, starting fresh");
                CheckpointState::empty(self.capacity)
            }
        }
    }

    /// Atomically replace a project's state
    pub async fn save(&self, collection: &str, state: &CheckpointState) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stored = StoredCheckpoint {
            last_seen_order_value: state.last_seen_order_value.clone(),
            last_updated_iso: None,
            seen_keys: state.seen_keys.iter().map(str::to_string).collect(),
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let tmp = self.temp_path_for(collection);
        let target = self.path_for(collection);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &target).await?;
        sync_dir(&self.dir).await;
        Ok(())
    }

    /// Add a key to the project's seen window and persist
    pub async fn record_seen(&self, collection: &str, key: &str) -> Result<CheckpointState> {
        let mut state = self.load(collection).await;
        state.mark_seen(key);
        self.save(collection, &state).await?;
        Ok(state)
    }

    /// Move the project's order value forward and persist
    pub async fn record_progress(
        &self,
        collection: &str,
        order_value: &str,
    ) -> Result<CheckpointState> {
        let mut state = self.load(collection).await;
        state.advance(Some(order_value));
        self.save(collection, &state).await?;
        Ok(state)
    }
}

// Makes the rename itself durable; best effort only
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = tokio::fs::File::open(dir).await {
        if let Err(e) = handle.sync_all().await {
            debug!(dir = %dir.display(), error = %e, "directory sync failed");
        }
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys(state: &CheckpointState) -> Vec<&str> {
        state.seen_keys.iter().collect()
    }

    #[test]
    fn seen_keys_evicts_oldest_first() {
        let mut seen = SeenKeys::new(3);
        for key in ["A-1", "A-2", "A-3", "A-4", "A-5"] {
            seen.insert(key);
            assert!(seen.len() <= 3);
        }

        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["A-3", "A-4", "A-5"]);
        assert!(!seen.contains("A-1"));
        assert!(seen.contains("A-5"));
    }

    #[test]
    fn reinserting_does_not_refresh_position() {
        let mut seen = SeenKeys::new(3);
        seen.insert("A-1");
        seen.insert("A-2");
        seen.insert("A-3");

        assert!(!seen.insert("A-1"), "duplicate insert is a no-op");
        seen.insert("A-4");

        assert!(!seen.contains("A-1"), "FIFO evicts A-1 even though it was re-seen");
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["A-2", "A-3", "A-4"]);
    }

    #[test]
    fn from_keys_keeps_newest_and_drops_duplicates() {
        let seen = SeenKeys::from_keys(
            ["A-1", "A-2", "A-2", "A-3", "A-4"].map(String::from),
            2,
        );
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["A-3", "A-4"]);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut state = CheckpointState::empty(10);
        state.advance(Some("2024-01-02T00:00:00.000+0000"));
        state.advance(Some("2024-01-01T00:00:00.000+0000"));
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2024-01-02T00:00:00.000+0000")
        );

        state.advance(None);
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2024-01-02T00:00:00.000+0000"),
            "missing order value falls back to the previous one"
        );

        state.advance(Some("2024-01-03T00:00:00.000+0000"));
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2024-01-03T00:00:00.000+0000")
        );
    }

    #[tokio::test]
    async fn load_missing_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints"), 100);

        let state = store.load("ABC").await;
        assert_eq!(state, CheckpointState::empty(100));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 100);

        let mut state = CheckpointState::empty(100);
        state.mark_seen("ABC-1");
        state.mark_seen("ABC-2");
        state.advance(Some("2024-05-01T10:00:00.000+0000"));
        store.save("ABC", &state).await.unwrap();

        let loaded = store.load("ABC").await;
        assert_eq!(loaded, state);
        assert!(
            !dir.path().join(".ABC.json.tmp").exists(),
            "temp file is renamed away"
        );
    }

    #[tokio::test]
    async fn corrupt_checkpoint_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 100);
        std::fs::write(
            store.path_for("ABC"),
            r#"{"last_seen_order_value": "2024-01-0"#,
        )
        .unwrap();

        let state = store.load("ABC").await;
        assert_eq!(state, CheckpointState::empty(100));
    }

    #[tokio::test]
    async fn interrupted_write_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 100);

        let mut old = CheckpointState::empty(100);
        old.mark_seen("ABC-1");
        old.advance(Some("2024-01-01T00:00:00.000+0000"));
        store.save("ABC", &old).await.unwrap();

        // A crash between write and rename leaves only a partial temp file behind
        std::fs::write(
            dir.path().join(".ABC.json.tmp"),
            r#"{"last_seen_order_value": "2024-02"#,
        )
        .unwrap();

        assert_eq!(store.load("ABC").await, old);

        // The next save replaces the leftover temp file
        let mut new = old.clone();
        new.mark_seen("ABC-2");
        store.save("ABC", &new).await.unwrap();
        assert_eq!(store.load("ABC").await, new);
    }

    #[tokio::test]
    async fn record_seen_never_exceeds_capacity() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 3);

        for i in 1..=10 {
            let state = store.record_seen("ABC", &format!("ABC-{i}")).await.unwrap();
            assert!(state.seen_keys.len() <= 3);
        }

        let state = store.load("ABC").await;
        assert_eq!(keys(&state), vec!["ABC-8", "ABC-9", "ABC-10"]);
    }

    #[tokio::test]
    async fn record_progress_persists_order_value() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 10);

        store
            .record_progress("ABC", "2024-03-01T00:00:00.000+0000")
            .await
            .unwrap();
        store.record_seen("ABC", "ABC-9").await.unwrap();

        let state = store.load("ABC").await;
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2024-03-01T00:00:00.000+0000")
        );
        assert_eq!(keys(&state), vec!["ABC-9"]);
    }

    #[tokio::test]
    async fn legacy_field_name_and_oversized_window_load() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 2);
        std::fs::write(
            store.path_for("OLD"),
            r#"{"last_updated_iso": "2023-12-31T23:59:59.000+0000", "seen_keys": ["OLD-1", "OLD-2", "OLD-3"]}"#,
        )
        .unwrap();

        let state = store.load("OLD").await;
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2023-12-31T23:59:59.000+0000")
        );
        assert_eq!(keys(&state), vec!["OLD-2", "OLD-3"]);
    }

    #[tokio::test]
    async fn current_field_wins_over_legacy_field() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 10);
        std::fs::write(
            store.path_for("MIX"),
            r#"{"last_updated_iso": "2023-01-01T00:00:00.000+0000", "last_seen_order_value": "2024-06-01T00:00:00.000+0000", "seen_keys": ["MIX-1"]}"#,
        )
        .unwrap();

        let state = store.load("MIX").await;
        assert_eq!(
            state.last_seen_order_value.as_deref(),
            Some("2024-06-01T00:00:00.000+0000")
        );
        assert_eq!(keys(&state), vec!["MIX-1"]);

        // Rewritten files only carry the current field name
        store.save("MIX", &state).await.unwrap();
        let raw = std::fs::read_to_string(store.path_for("MIX")).unwrap();
        assert!(!raw.contains("last_updated_iso"));
    }

    #[tokio::test]
    async fn projects_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path(), 10);

        store.record_seen("ABC", "ABC-1").await.unwrap();
        store.record_seen("XYZ", "XYZ-1").await.unwrap();

        assert_eq!(keys(&store.load("ABC").await), vec!["ABC-1"]);
        assert_eq!(keys(&store.load("XYZ").await), vec!["XYZ-1"]);
    }
}
