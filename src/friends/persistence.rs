//! Snapshot persistence for the forward map.
//!
//! The whole forward map is written as one named blob after every successful
//! mutation. Three backends share the [`SnapshotStore`] contract:
//!
//! - [`SledSnapshotStore`] - bincode blob in a sled tree (default)
//! - [`JsonFileSnapshotStore`] - pretty JSON file, exclusive lock + atomic rename
//! - [`MemorySnapshotStore`] - in-process, with write-failure injection for tests
//!
//! The reverse index is never persisted.

use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use fs2::FileExt;

use crate::config::{StorageBackend, StorageConfig};
use crate::friends::errors::FriendsError;
use crate::friends::store::Snapshot;

const TREE_FRIENDS: &str = "friends";

pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been written yet.
    fn load(&self) -> Result<Option<Snapshot>, FriendsError>;

    /// Single write attempt; returns once the backend reports the data durable.
    fn save(&self, snapshot: &Snapshot) -> Result<(), FriendsError>;

    fn describe(&self) -> String;
}

/// Open the backend selected in `[storage]`.
pub fn open_configured(config: &StorageConfig) -> Result<Box<dyn SnapshotStore>, FriendsError> {
    match config.backend {
        StorageBackend::Sled => {
            let path = config
                .sled_path
                .clone()
                .map(PathBuf::from)
                .unwrap_or_else(|| Path::new(&config.data_dir).join("friends.db"));
            Ok(Box::new(SledSnapshotStore::open(path, &config.blob_name)?))
        }
        StorageBackend::Json => Ok(Box::new(JsonFileSnapshotStore::open(
            &config.data_dir,
            &config.blob_name,
        )?)),
    }
}

/// Sled-backed snapshot: one key (the blob name) in the `friends` tree.
pub struct SledSnapshotStore {
    _db: sled::Db,
    tree: sled::Tree,
    key: Vec<u8>,
    path: PathBuf,
}

impl SledSnapshotStore {
    pub fn open<P: AsRef<Path>>(path: P, blob_name: &str) -> Result<Self, FriendsError> {
        let path_ref = path.as_ref();
        fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let tree = db.open_tree(TREE_FRIENDS)?;
        Ok(Self {
            _db: db,
            tree,
            key: format!("snapshot:{}", blob_name).into_bytes(),
            path: path_ref.to_path_buf(),
        })
    }
}

impl SnapshotStore for SledSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, FriendsError> {
        let Some(bytes) = self.tree.get(&self.key)? else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize::<Snapshot>(&bytes)?))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FriendsError> {
        let bytes = bincode::serialize(snapshot)?;
        self.tree.insert(&self.key, bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sled:{}", self.path.display())
    }
}

/// JSON file snapshot at `<data_dir>/<blob_name>.json`.
///
/// Reads also accept data files written with capitalised `Name`/`Friends` keys.
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn open(data_dir: impl AsRef<Path>, blob_name: &str) -> Result<Self, FriendsError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{}.json", blob_name)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the snapshot file via a temp file and rename.
    ///
    /// The service mutex only orders writers inside one process. The lock is
    /// taken on a sidecar `.lock` file, which the rename never replaces, so a
    /// second process (the admin CLI next to a running host) waits its turn.
    fn write_file_locked(path: &Path, content: &str) -> Result<(), FriendsError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path.with_extension("json.lock"))?;
        lock_file.lock_exclusive()?;

        let tmp_path = path.with_extension("json.tmp");
        let written = File::create(&tmp_path).and_then(|mut tmp| {
            tmp.write_all(content.as_bytes())?;
            tmp.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        drop(lock_file);
        Ok(())
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, FriendsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}; starting empty", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        // an empty file holds nothing yet
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FriendsError> {
        let content = serde_json::to_string_pretty(snapshot)?;
        Self::write_file_locked(&self.path, &content)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blob: Mutex<Option<Snapshot>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            blob: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` fail until switched off again.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Snapshot> {
        self.blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, FriendsError> {
        Ok(self.current())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FriendsError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!("Memory snapshot store rejecting write (failure injected)");
            return Err(FriendsError::Unavailable("write failure injected".into()));
        }
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Lets a test keep a handle on the store it hands to the service.
impl<T: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<Snapshot>, FriendsError> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FriendsError> {
        (**self).save(snapshot)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friends::types::{ParticipantId, RelationshipRecord};
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let mut record = RelationshipRecord::new("Alice");
        record.friends.insert(ParticipantId::new("bob").unwrap());
        let mut snapshot = Snapshot::new();
        snapshot.insert(ParticipantId::new("alice").unwrap(), record);
        snapshot.insert(
            ParticipantId::new("bob").unwrap(),
            RelationshipRecord::new("Bob"),
        );
        snapshot
    }

    #[test]
    fn sled_store_round_trip_and_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = SledSnapshotStore::open(dir.path(), "Friends").expect("open");
            assert!(store.load().expect("load").is_none());
            store.save(&sample()).expect("save");
        }
        let store = SledSnapshotStore::open(dir.path(), "Friends").expect("reopen");
        assert_eq!(store.load().expect("load"), Some(sample()));
    }

    #[test]
    fn sled_blob_names_are_independent() {
        let dir = TempDir::new().expect("tempdir");
        let store = SledSnapshotStore::open(dir.path(), "Friends").expect("open");
        store.save(&sample()).expect("save");
        drop(store);
        let other = SledSnapshotStore::open(dir.path(), "Other").expect("open");
        assert!(other.load().expect("load").is_none());
    }

    #[test]
    fn json_store_round_trip_leaves_no_temp_files() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileSnapshotStore::open(dir.path(), "Friends").expect("open");
        assert!(store.load().expect("load").is_none());
        store.save(&sample()).expect("save");
        assert_eq!(store.load().expect("load"), Some(sample()));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn json_store_reads_legacy_data_file() {
        let dir = TempDir::new().expect("tempdir");
        let legacy = r#"{
            "76561198000000001": { "Name": "Alice", "Friends": ["76561198000000002"] },
            "76561198000000002": { "Name": "Bob", "Friends": [] }
        }"#;
        fs::write(dir.path().join("Friends.json"), legacy).unwrap();
        let store = JsonFileSnapshotStore::open(dir.path(), "Friends").expect("open");
        let snapshot = store.load().expect("load").expect("present");
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot["76561198000000001"].friends.contains("76561198000000002"));
    }

    #[test]
    fn memory_store_failure_injection() {
        let store = MemorySnapshotStore::new();
        store.fail_writes(true);
        assert!(matches!(
            store.save(&sample()),
            Err(FriendsError::Unavailable(_))
        ));
        assert_eq!(store.write_count(), 0);
        store.fail_writes(false);
        store.save(&sample()).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.current(), Some(sample()));
    }
}
