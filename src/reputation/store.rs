use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::PathBuf,
    sync::Arc,
};

use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, warn};

use crate::{
    common::errors::StorageError, common::types::UserId, reputation::ledger::ActivityLedger,
};

/// Durable home of the reputation snapshot: one JSON document mapping user id
/// to score. The file stays human-inspectable and forward-compatible; loading
/// skips anything it does not recognize.
#[derive(Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last durable snapshot, or empty. Missing and corrupt documents both
    /// read as empty: losing scores beats refusing to boot.
    pub fn load(&self) -> HashMap<UserId, i64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot at {}, starting empty", self.path.display());
                return HashMap::new();
            }
            Err(e) => {
                warn!("snapshot unreadable ({}), starting empty", e);
                return HashMap::new();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("snapshot corrupt ({}), starting empty", e);
                return HashMap::new();
            }
        };
        let Some(map) = value.as_object() else {
            warn!("snapshot is not a map, starting empty");
            return HashMap::new();
        };

        let mut scores = HashMap::new();
        for (key, val) in map {
            let (Ok(user), Some(score)) = (key.parse::<u64>(), val.as_i64()) else {
                continue;
            };
            scores.insert(UserId(user), score);
        }
        scores
    }

    /// Write the full snapshot atomically: serialize to a uniquely named
    /// sibling temp file, then rename over the document. Concurrent savers
    /// never share a temp file, so the last rename wins and readers never see
    /// interleaved bytes.
    pub fn save(&self, scores: &BTreeMap<String, i64>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let tmp = self.path.with_extension(format!("json.{suffix}.tmp"));

        fs::write(&tmp, serde_json::to_vec_pretty(scores)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Single consumer of save triggers. Every mutation drops a `()` on the
/// channel; this loop coalesces whatever has queued up into one write and
/// runs the filesystem work on the blocking pool, keeping the scheduler
/// threads free.
pub(crate) async fn run_snapshot_writer(
    ledger: Arc<ActivityLedger>,
    store: SnapshotStore,
    rx: flume::Receiver<()>,
) {
    while rx.recv_async().await.is_ok() {
        while rx.try_recv().is_ok() {}

        let scores = ledger.export();
        let store = store.clone();
        match tokio::task::spawn_blocking(move || store.save(&scores)).await {
            Ok(Ok(())) => debug!("snapshot written"),
            Ok(Err(e)) => warn!("snapshot write failed: {}", e),
            Err(e) => warn!("snapshot writer task died: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> SnapshotStore {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        SnapshotStore::new(
            std::env::temp_dir().join(format!("jukebot-{name}-{suffix}.json")),
        )
    }

    #[test]
    fn round_trip_preserves_scores() {
        let store = temp_store("roundtrip");
        let scores = BTreeMap::from([
            ("100".to_string(), 250),
            ("200".to_string(), 1000),
            ("300".to_string(), 100),
        ]);
        store.save(&scores).expect("save");

        let loaded = store.load();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(&UserId(100)), Some(&250));
        assert_eq!(loaded.get(&UserId(200)), Some(&1000));
        assert_eq!(loaded.get(&UserId(300)), Some(&100));
    }

    #[test]
    fn missing_document_loads_empty() {
        let store = temp_store("missing");
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_document_loads_empty() {
        let store = temp_store("corrupt");
        fs::write(&store.path, b"{ not json at all").expect("write junk");
        assert!(store.load().is_empty());
    }

    #[test]
    fn unknown_entries_are_ignored() {
        let store = temp_store("forward-compat");
        fs::write(
            &store.path,
            br#"{"100": 240, "not-a-user": 5, "200": "high", "300": {"nested": 1}, "400": 320}"#,
        )
        .expect("write");

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(&UserId(100)), Some(&240));
        assert_eq!(loaded.get(&UserId(400)), Some(&320));
    }

    #[test]
    fn save_replaces_the_previous_document() {
        let store = temp_store("replace");
        store
            .save(&BTreeMap::from([("1".to_string(), 150)]))
            .expect("first save");
        store
            .save(&BTreeMap::from([("2".to_string(), 700)]))
            .expect("second save");

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&UserId(2)), Some(&700));
    }
}
