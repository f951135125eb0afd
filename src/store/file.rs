//! File-backed store
//!
//! Every committed transaction is appended as one JSON line to
//! `tracking.jsonl` and fsynced before it becomes visible. On open the journal
//! is replayed to rebuild raw events and aggregates, so the journal is the
//! only source of truth.
//!
//! Commits run on the blocking pool with the journal lock held from staging to
//! apply. Readers only take the state lock, so they never wait on an fsync.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::state::StoreState;
use super::transaction::{CommitSummary, Transaction};
use super::TrackingStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{AggregateMetric, StoredEvent};

/// Configuration for the FileStore
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
    /// Whether to fsync after each commit
    pub sync_on_commit: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sync_on_commit: true,
        }
    }
}

impl FileStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Get path to the journal
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("tracking.jsonl")
    }
}

/// One journal line
#[derive(Debug, Serialize, Deserialize)]
struct JournalRecord {
    seq: u64,
    #[serde(rename = "ts")]
    committed_at: DateTime<Utc>,
    tx: Transaction,
}

struct Journal {
    file: File,
    /// Length of the journal up to the last complete record
    len: u64,
    next_seq: u64,
}

/// Store persisting transactions to an append-only JSONL journal
pub struct FileStore {
    config: FileStoreConfig,
    state: Arc<RwLock<StoreState>>,
    /// Held for the whole commit, serialising writers
    journal: Arc<Mutex<Journal>>,
}

impl FileStore {
    /// Open (or create) the journal and replay it
    pub fn open(config: FileStoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let path = config.journal_path();

        let mut state = StoreState::new();
        let mut next_seq = 1;
        let mut len = 0u64;
        let mut replayed = 0usize;

        if path.exists() {
            let bytes = std::fs::read(&path)?;
            // Anything after the last newline is a torn write
            len = bytes
                .iter()
                .rposition(|&b| b == b'\n')
                .map_or(0, |pos| pos as u64 + 1);
            if (len as usize) < bytes.len() {
                warn!(
                    bytes = bytes.len() - len as usize,
                    "Discarding incomplete record at end of tracking journal"
                );
            }

            for (line_num, line) in bytes[..len as usize].split(|&b| b == b'\n').enumerate() {
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }

                let record: JournalRecord = match serde_json::from_slice(line) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(line = line_num + 1, error = %e, "Skipping unreadable journal record");
                        continue;
                    }
                };

                match state.stage(&record.tx, record.committed_at) {
                    Ok(staged) => {
                        state.apply(staged);
                        replayed += 1;
                    }
                    Err(e) => {
                        warn!(seq = record.seq, error = %e, "Skipping journal record that no longer applies");
                    }
                }
                next_seq = next_seq.max(record.seq + 1);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Drop any torn tail so the next append starts on a clean line
        file.set_len(len)?;

        info!(
            path = %path.display(),
            transactions = replayed,
            events = state.event_count(),
            ads = state.metric_count(),
            "Tracking journal loaded"
        );

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(state)),
            journal: Arc::new(Mutex::new(Journal { file, len, next_seq })),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Total number of raw event rows
    pub fn event_count(&self) -> usize {
        self.state.read().event_count()
    }
}

impl Journal {
    fn append(&mut self, record: &JournalRecord, sync: bool) -> StoreResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let written = self.file.write_all(&line).and_then(|_| {
            if sync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            // Roll back a partial line; if that fails too the next open trims it
            let _ = self.file.set_len(self.len);
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.next_seq += 1;
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for FileStore {
    async fn transaction(&self, tx: Transaction) -> StoreResult<CommitSummary> {
        let state = Arc::clone(&self.state);
        let journal = Arc::clone(&self.journal);
        let sync = self.config.sync_on_commit;

        // Runs to completion even if the caller goes away, so the journal and
        // the in-memory state never diverge
        tokio::task::spawn_blocking(move || -> StoreResult<CommitSummary> {
            let mut journal = journal.lock();
            let now = Utc::now();

            let staged = state.read().stage(&tx, now)?;

            let record = JournalRecord {
                seq: journal.next_seq,
                committed_at: now,
                tx,
            };
            journal.append(&record, sync)?;

            Ok(state.write().apply(staged))
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("journal writer failed: {e}")))?
    }

    async fn get_metric(&self, ad_id: &str) -> StoreResult<Option<AggregateMetric>> {
        Ok(self.state.read().metric(ad_id))
    }

    async fn events_for_ad(
        &self,
        ad_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<StoredEvent>> {
        Ok(self.state.read().events_for_ad(ad_id, since, limit))
    }

    async fn events_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<StoredEvent>> {
        Ok(self.state.read().events_since(since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Duration;
    use tempfile::TempDir;

    use crate::types::{EventKind, TrackingEvent};

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        (store, temp_dir)
    }

    fn click_tx(ad_id: &str, n: u64) -> Transaction {
        let rows = (0..n).map(|_| TrackingEvent::new(EventKind::Click, ad_id)).collect();
        let mut counts = BTreeMap::new();
        counts.insert("clicks".to_string(), n);

        let mut tx = Transaction::new();
        tx.create_many(rows).upsert(ad_id, counts.clone(), counts);
        tx
    }

    #[tokio::test]
    async fn test_commit_and_reopen() {
        let (store, temp_dir) = create_test_store();

        store.transaction(click_tx("A", 2)).await.unwrap();
        store.transaction(click_tx("A", 3)).await.unwrap();
        store.transaction(click_tx("B", 1)).await.unwrap();
        drop(store);

        let reopened = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        assert_eq!(reopened.event_count(), 6);

        let metric = reopened.get_metric("A").await.unwrap().unwrap();
        assert_eq!(metric.count("clicks"), 5);

        let recent = reopened
            .events_for_ad("B", Utc::now() - Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 6);
    }

    #[tokio::test]
    async fn test_torn_tail_is_skipped_and_trimmed() {
        let (store, temp_dir) = create_test_store();
        store.transaction(click_tx("A", 1)).await.unwrap();
        let journal = store.config().journal_path();
        drop(store);

        let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
        file.write_all(b"{\"seq\":2,\"ts\":\"2024-").unwrap();
        drop(file);

        let reopened = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        assert_eq!(reopened.event_count(), 1);

        // The next commit must land on its own line and survive another reopen
        reopened.transaction(click_tx("A", 1)).await.unwrap();
        drop(reopened);

        let again = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        assert_eq!(again.event_count(), 2);
        assert_eq!(again.get_metric("A").await.unwrap().unwrap().count("clicks"), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_is_not_journaled() {
        let (store, temp_dir) = create_test_store();

        let mut counts = BTreeMap::new();
        counts.insert("clicks".to_string(), u64::MAX);
        let mut tx = Transaction::new();
        tx.upsert("A", counts, BTreeMap::new());
        store.transaction(tx).await.unwrap();

        assert!(store.transaction(click_tx("A", 1)).await.is_err());
        drop(store);

        let reopened = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        assert_eq!(reopened.event_count(), 0);
        assert_eq!(
            reopened.get_metric("A").await.unwrap().unwrap().count("clicks"),
            u64::MAX
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_match_journal() {
        let (store, temp_dir) = create_test_store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let ad_id = if i % 2 == 0 { "A" } else { "B" };
            handles.push(tokio::spawn(async move {
                store.transaction(click_tx(ad_id, 2)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.event_count(), 16);
        assert_eq!(store.get_metric("A").await.unwrap().unwrap().count("clicks"), 8);
        drop(store);

        let reopened = FileStore::open(FileStoreConfig::new(temp_dir.path())).unwrap();
        let mut ids: Vec<u64> = reopened
            .events_since(Utc::now() - Duration::hours(1))
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
        assert_eq!(reopened.get_metric("B").await.unwrap().unwrap().count("clicks"), 8);
    }
}
