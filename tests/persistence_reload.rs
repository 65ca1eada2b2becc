mod common;

use std::sync::Arc;

use common::{harness, harness_with_store, id, ids};
use friendlist::config::{FriendsConfig, StorageBackend, StorageConfig};
use friendlist::friends::{
    open_configured, AddOutcome, FriendsError, FriendsService, MemorySnapshotStore,
    PresenceDirectory, RemoveOutcome,
};
use tempfile::TempDir;

fn storage(dir: &TempDir, backend: StorageBackend) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().to_string_lossy().into_owned(),
        backend,
        ..StorageConfig::default()
    }
}

fn open(config: &StorageConfig, directory: Arc<PresenceDirectory>) -> FriendsService {
    let store = open_configured(config).expect("open store");
    FriendsService::builder(store, directory)
        .open()
        .expect("open service")
}

fn reload_round_trip(backend: StorageBackend) {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir, backend);
    let directory = Arc::new(PresenceDirectory::new());
    for (raw, name) in [("a", "Ann"), ("b", "Ben"), ("c", "Cat")] {
        directory.connect(&id(raw), name);
    }

    {
        let service = open(&config, directory.clone());
        service.add_friend(&id("a"), &id("b")).unwrap();
        service.add_friend(&id("a"), &id("c")).unwrap();
        service.close().unwrap();
    }

    let service = open(&config, directory.clone());
    assert_eq!(service.get_friends(&id("a")), ids(&["b", "c"]));
    assert_eq!(service.get_friends_of(&id("b")), ids(&["a"]));
    assert_eq!(service.get_friends_of(&id("c")), ids(&["a"]));
    service.verify_index().unwrap();

    // cached names survive even when the directory forgets everyone
    directory.forget(&id("c"));
    assert_eq!(service.resolve_name(&id("c")), "Cat");
}

#[test]
fn sled_snapshot_survives_restart() {
    reload_round_trip(StorageBackend::Sled);
}

#[test]
fn json_snapshot_survives_restart() {
    reload_round_trip(StorageBackend::Json);
}

#[test]
fn missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    for backend in [StorageBackend::Sled, StorageBackend::Json] {
        let service = open(&storage(&dir, backend), Arc::new(PresenceDirectory::new()));
        assert_eq!(service.stats().records, 0);
    }
}

#[test]
fn legacy_json_field_names_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("Friends.json"),
        r#"{
  "76561198000000001": { "Name": "Ann", "Friends": ["76561198000000002"] },
  "76561198000000002": { "Name": "Ben" }
}"#,
    )
    .unwrap();

    let service = open(
        &storage(&dir, StorageBackend::Json),
        Arc::new(PresenceDirectory::new()),
    );
    assert!(service.has_friend(&id("76561198000000001"), &id("76561198000000002")));
    assert_eq!(
        service.get_friends_of(&id("76561198000000002")),
        ids(&["76561198000000001"])
    );
    assert_eq!(service.resolve_name(&id("76561198000000002")), "Ben");
}

#[test]
fn failed_write_rolls_back_add() {
    let h = harness(FriendsConfig::default(), &[("a", "Ann"), ("b", "Ben")]);
    h.store.fail_writes(true);

    let err = h.service.add_friend(&id("a"), &id("b")).unwrap_err();
    assert!(matches!(err, FriendsError::Unavailable(_)));
    assert!(!h.service.has_friend(&id("a"), &id("b")));
    assert!(h.service.get_friends_of(&id("b")).is_empty());
    assert_eq!(h.service.stats().records, 0);
    assert!(h.sink.messages().is_empty(), "no notice for a failed add");
    h.service.verify_index().unwrap();

    h.store.fail_writes(false);
    assert_eq!(h.service.add_friend(&id("a"), &id("b")).unwrap(), AddOutcome::Added);
}

#[test]
fn failed_write_rolls_back_remove() {
    let h = harness(FriendsConfig::default(), &[("a", "Ann"), ("b", "Ben")]);
    h.service.add_friend(&id("a"), &id("b")).unwrap();
    h.store.fail_writes(true);

    assert!(h.service.remove_friend(&id("a"), &id("b")).is_err());
    assert!(h.service.has_friend(&id("a"), &id("b")));
    assert_eq!(h.service.get_friends_of(&id("b")), ids(&["a"]));

    h.store.fail_writes(false);
    assert_eq!(
        h.service.remove_friend(&id("a"), &id("b")).unwrap(),
        RemoveOutcome::Removed
    );
}

#[test]
fn preloaded_snapshot_rebuilds_reverse_index() {
    let seed = harness(FriendsConfig::default(), &[("a", "Ann"), ("b", "Ben"), ("c", "Cat")]);
    seed.service.add_friend(&id("a"), &id("c")).unwrap();
    seed.service.add_friend(&id("b"), &id("c")).unwrap();
    let snapshot = seed.store.current().expect("written");

    let h = harness_with_store(
        FriendsConfig::default(),
        &[],
        Arc::new(MemorySnapshotStore::with_snapshot(snapshot)),
    );
    assert_eq!(h.service.get_friends_of(&id("c")), ids(&["a", "b"]));
    assert_eq!(h.service.stats().relationships, 2);
    h.service.verify_index().unwrap();
}

#[test]
fn repeated_friend_ids_in_snapshot_load_once() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("Friends.json"),
        r#"{
  "a": { "name": "Ann", "friends": ["b", "b", "c"] },
  "b": { "name": "Ben", "friends": [] },
  "c": { "name": "Cat", "friends": [] }
}"#,
    )
    .unwrap();
    let directory = Arc::new(PresenceDirectory::new());
    directory.register_offline(&id("a"), "Ann");
    directory.register_offline(&id("b"), "Ben");

    let service = open(&storage(&dir, StorageBackend::Json), directory);
    assert_eq!(service.get_friends(&id("a")), ids(&["b", "c"]));
    assert_eq!(service.stats().relationships, 2);

    assert_eq!(
        service.remove_friend(&id("a"), &id("b")).unwrap(),
        RemoveOutcome::Removed
    );
    assert!(!service.has_friend(&id("a"), &id("b")));
    assert!(service.get_friends_of(&id("b")).is_empty());
    service.verify_index().unwrap();
}
