//! Directed friend graph with a derived reverse index, snapshot persistence,
//! presence notifications and deferred events for policy observers.

pub mod directory;
pub mod errors;
pub mod events;
pub mod graph;
pub mod notify;
pub mod persistence;
pub mod policy;
pub mod reverse;
pub mod service;
pub mod store;
pub mod types;

pub use directory::{Directory, MatchResult, Participant, PresenceDirectory};
pub use errors::FriendsError;
pub use events::{event_channel, EventDispatcher, EventQueue, FriendEvent, FriendObserver};
pub use graph::FriendGraph;
pub use notify::{LogSink, MessageSink, Notice, RecordingSink};
pub use persistence::{
    open_configured, JsonFileSnapshotStore, MemorySnapshotStore, SledSnapshotStore, SnapshotStore,
};
pub use policy::PolicyHooks;
pub use reverse::ReverseIndex;
pub use service::{FriendsService, FriendsServiceBuilder};
pub use store::{Admission, RelationshipStore, Snapshot};
pub use types::*;
