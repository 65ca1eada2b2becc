//! Test utilities & fixtures.
//! Wires a friends service to an in-memory directory, recording sink,
//! memory snapshot store and an undriven event dispatcher.

use std::sync::Arc;

use friendlist::config::FriendsConfig;
use friendlist::friends::{
    event_channel, EventDispatcher, FriendsService, MemorySnapshotStore, ParticipantId,
    PresenceDirectory, RecordingSink,
};

pub fn id(raw: &str) -> ParticipantId {
    ParticipantId::new(raw).expect("valid id")
}

#[allow(dead_code)] // not every test file touches every handle
pub struct Harness {
    pub service: Arc<FriendsService>,
    pub directory: Arc<PresenceDirectory>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemorySnapshotStore>,
    pub dispatcher: EventDispatcher,
}

/// Build a harness where every `(id, name)` pair is connected.
#[allow(dead_code)]
pub fn harness(config: FriendsConfig, online: &[(&str, &str)]) -> Harness {
    harness_with_store(config, online, Arc::new(MemorySnapshotStore::new()))
}

#[allow(dead_code)]
pub fn harness_with_store(
    config: FriendsConfig,
    online: &[(&str, &str)],
    store: Arc<MemorySnapshotStore>,
) -> Harness {
    let directory = Arc::new(PresenceDirectory::new());
    for (raw, name) in online {
        directory.connect(&id(raw), name);
    }
    let sink = Arc::new(RecordingSink::new());
    let (events, dispatcher) = event_channel();
    let service = FriendsService::builder(Box::new(store.clone()), directory.clone())
        .config(config)
        .sink(sink.clone())
        .events(events)
        .open()
        .expect("open service");
    Harness {
        service: Arc::new(service),
        directory,
        sink,
        store,
        dispatcher,
    }
}

#[allow(dead_code)]
pub fn ids(raw: &[&str]) -> Vec<ParticipantId> {
    raw.iter().map(|r| id(r)).collect()
}
