//! The friends service: mutation, query and presence entry points.
//!
//! All state lives in one [`FriendGraph`] behind a single mutex. A mutation
//! holds that lock while it updates the forward map, the reverse index and
//! writes the snapshot, and queues the matching event before letting go so
//! events reach the dispatcher in commit order. Notifications are sent only
//! after the lock is released, and observers run later from the dispatcher,
//! so no collaborator can observe a half-applied change or re-enter the
//! critical section.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::FriendsConfig;
use crate::friends::directory::{Directory, MatchResult, Participant};
use crate::friends::errors::FriendsError;
use crate::friends::events::{EventQueue, FriendEvent};
use crate::friends::graph::FriendGraph;
use crate::friends::notify::{LogSink, MessageSink, Notice};
use crate::friends::persistence::SnapshotStore;
use crate::friends::store::Admission;
use crate::friends::types::{
    AddOutcome, ChatOutcome, FriendListing, GraphStats, ParticipantId, RejectReason, RemoveOutcome,
};

/// Builder so hosts and tests can wire only the collaborators they care about.
pub struct FriendsServiceBuilder {
    config: FriendsConfig,
    store: Box<dyn SnapshotStore>,
    directory: Arc<dyn Directory>,
    sink: Arc<dyn MessageSink>,
    events: EventQueue,
}

impl FriendsServiceBuilder {
    pub fn new(store: Box<dyn SnapshotStore>, directory: Arc<dyn Directory>) -> Self {
        Self {
            config: FriendsConfig::default(),
            store,
            directory,
            sink: Arc::new(LogSink),
            events: EventQueue::detached(),
        }
    }

    pub fn config(mut self, config: FriendsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn events(mut self, events: EventQueue) -> Self {
        self.events = events;
        self
    }

    pub fn open(self) -> Result<FriendsService, FriendsError> {
        FriendsService::open(self)
    }
}

pub struct FriendsService {
    config: FriendsConfig,
    graph: Mutex<FriendGraph>,
    store: Box<dyn SnapshotStore>,
    directory: Arc<dyn Directory>,
    sink: Arc<dyn MessageSink>,
    events: EventQueue,
}

impl FriendsService {
    pub fn builder(store: Box<dyn SnapshotStore>, directory: Arc<dyn Directory>) -> FriendsServiceBuilder {
        FriendsServiceBuilder::new(store, directory)
    }

    /// Load the persisted snapshot (absent means empty) and rebuild the reverse index.
    fn open(builder: FriendsServiceBuilder) -> Result<Self, FriendsError> {
        let snapshot = builder.store.load()?.unwrap_or_default();
        let graph = FriendGraph::from_snapshot(snapshot);
        let stats = graph.stats();
        info!(
            "Friends loaded from {}: {} records, {} relationships, {} reverse entries",
            builder.store.describe(),
            stats.records,
            stats.relationships,
            stats.reverse_entries
        );
        Ok(Self {
            config: builder.config,
            graph: Mutex::new(graph),
            store: builder.store,
            directory: builder.directory,
            sink: builder.sink,
            events: builder.events,
        })
    }

    fn graph(&self) -> MutexGuard<'_, FriendGraph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &FriendsConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    pub fn max_friends(&self) -> i32 {
        self.config.max_friends
    }

    /// Capability probe: relationships are one-directional by policy, adding
    /// someone never implies they added you back.
    pub fn is_one_directional(&self) -> bool {
        true
    }

    pub fn has_friend(&self, owner: &ParticipantId, friend: &ParticipantId) -> bool {
        self.graph().has_friend(owner.as_str(), friend.as_str())
    }

    pub fn are_friends(&self, a: &ParticipantId, b: &ParticipantId) -> bool {
        self.graph().are_friends(a.as_str(), b.as_str())
    }

    pub fn get_friends(&self, owner: &ParticipantId) -> Vec<ParticipantId> {
        self.graph().friends(owner.as_str())
    }

    /// Everyone who lists `friend` on their own list.
    pub fn get_friends_of(&self, friend: &ParticipantId) -> Vec<ParticipantId> {
        self.graph().friends_of(friend.as_str())
    }

    /// Live name, then cached name, then `#<id>`.
    pub fn resolve_name(&self, id: &ParticipantId) -> String {
        if let Some(live) = self.directory.lookup(id) {
            return live.name;
        }
        self.graph()
            .cached_name(id.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| id.placeholder_name())
    }

    /// Sorted display view. A friend only shows as online when connected and
    /// listing the owner back, so one-sided adds never leak presence.
    pub fn friend_listing(&self, owner: &ParticipantId) -> FriendListing {
        let friends = self.get_friends(owner);
        let mut listing = FriendListing {
            count: friends.len(),
            max: self.config.max_friends,
            ..FriendListing::default()
        };
        for friend_id in &friends {
            match self.directory.lookup(friend_id) {
                Some(friend) if friend.is_connected && self.has_friend(&friend.id, owner) => {
                    listing.online.push(friend.name)
                }
                Some(friend) => listing.offline.push(friend.name),
                None => listing.offline.push(self.resolve_name(friend_id)),
            }
        }
        listing.online.sort_by_key(|name| name.to_lowercase());
        listing.offline.sort_by_key(|name| name.to_lowercase());
        listing
    }

    pub fn stats(&self) -> GraphStats {
        self.graph().stats()
    }

    pub fn verify_index(&self) -> Result<(), FriendsError> {
        self.graph().verify()
    }

    /// Add `friend` to `owner`'s list. Both must currently be connected.
    pub fn add_friend(&self, owner: &ParticipantId, friend: &ParticipantId) -> Result<AddOutcome, FriendsError> {
        if owner == friend {
            return Ok(AddOutcome::Rejected(RejectReason::SelfReference));
        }
        let (Some(owner), Some(friend)) = (self.connected(owner), self.connected(friend)) else {
            return Ok(AddOutcome::Rejected(RejectReason::UnknownParticipant));
        };
        self.add_resolved(owner, friend)
    }

    /// Add by name or id, resolved through the directory.
    pub fn add_friend_by_query(&self, owner: &ParticipantId, query: &str) -> Result<AddOutcome, FriendsError> {
        let Some(owner) = self.connected(owner) else {
            return Ok(AddOutcome::Rejected(RejectReason::UnknownParticipant));
        };
        match self.directory.find_by_name_or_id(query) {
            MatchResult::Found(friend) if friend.id == owner.id => {
                Ok(AddOutcome::Rejected(RejectReason::SelfReference))
            }
            MatchResult::Found(friend) if friend.is_connected => self.add_resolved(owner, friend),
            MatchResult::Found(_) | MatchResult::NotFound => {
                Ok(AddOutcome::Rejected(RejectReason::UnknownParticipant))
            }
            MatchResult::Ambiguous(_) => Ok(AddOutcome::Rejected(RejectReason::AmbiguousTarget)),
        }
    }

    fn add_resolved(&self, owner: Participant, friend: Participant) -> Result<AddOutcome, FriendsError> {
        {
            let mut graph = self.graph();
            match graph.admission(owner.id.as_str(), friend.id.as_str(), self.config.capacity()) {
                Admission::Duplicate => return Ok(AddOutcome::AlreadyFriends),
                Admission::Full => return Ok(AddOutcome::Rejected(RejectReason::CapacityExceeded)),
                Admission::Open => {}
            }
            let checkpoint = graph.checkpoint(&[&owner.id, &friend.id]);
            graph.link(&owner, &friend);
            if let Err(e) = self.store.save(graph.snapshot()) {
                graph.restore(checkpoint);
                warn!("Failed to persist {} -> {}: {}; change rolled back", owner.id, friend.id, e);
                return Err(e);
            }
            // queued under the lock so delivery order matches commit order
            self.events.enqueue(FriendEvent::Added {
                owner: owner.clone(),
                friend: friend.clone(),
            });
        }
        debug!("{} added {} as a friend", owner.id, friend.id);

        if self.config.send_added_notification {
            let notice = Notice::Added { by: owner.name };
            self.sink.send(&friend.id, &notice.to_string());
        }
        Ok(AddOutcome::Added)
    }

    /// Remove `friend` from `owner`'s list. Both must be known to the directory,
    /// connected or not. The reverse direction is left alone.
    pub fn remove_friend(&self, owner: &ParticipantId, friend: &ParticipantId) -> Result<RemoveOutcome, FriendsError> {
        let (Some(owner), Some(friend)) = (self.directory.lookup(owner), self.directory.lookup(friend)) else {
            return Ok(RemoveOutcome::Rejected(RejectReason::UnknownParticipant));
        };
        self.remove_resolved(owner, friend)
    }

    pub fn remove_friend_by_query(&self, owner: &ParticipantId, query: &str) -> Result<RemoveOutcome, FriendsError> {
        let Some(owner) = self.directory.lookup(owner) else {
            return Ok(RemoveOutcome::Rejected(RejectReason::UnknownParticipant));
        };
        match self.directory.find_by_name_or_id(query) {
            MatchResult::Found(friend) => self.remove_resolved(owner, friend),
            MatchResult::Ambiguous(_) => Ok(RemoveOutcome::Rejected(RejectReason::AmbiguousTarget)),
            MatchResult::NotFound => Ok(RemoveOutcome::Rejected(RejectReason::UnknownParticipant)),
        }
    }

    fn remove_resolved(&self, owner: Participant, friend: Participant) -> Result<RemoveOutcome, FriendsError> {
        {
            let mut graph = self.graph();
            if !graph.has_friend(owner.id.as_str(), friend.id.as_str()) {
                return Ok(RemoveOutcome::NotFriends);
            }
            let checkpoint = graph.checkpoint(&[&owner.id, &friend.id]);
            graph.unlink(owner.id.as_str(), friend.id.as_str());
            if let Err(e) = self.store.save(graph.snapshot()) {
                graph.restore(checkpoint);
                warn!("Failed to persist removal {} -> {}: {}; change rolled back", owner.id, friend.id, e);
                return Err(e);
            }
            self.events.enqueue(FriendEvent::Removed {
                owner: owner.clone(),
                friend: friend.clone(),
            });
        }
        debug!("{} removed {} as a friend", owner.id, friend.id);

        if self.config.send_removed_notification {
            let notice = Notice::Removed { by: owner.name };
            self.sink.send(&friend.id, &notice.to_string());
        }
        Ok(RemoveOutcome::Removed)
    }

    /// Reconcile the cached name and tell connected friends. Returns the number
    /// of notifications sent.
    pub fn on_connected(&self, participant: &Participant) -> Result<usize, FriendsError> {
        let friends = {
            let mut graph = self.graph();
            let id = participant.id.as_str();
            if graph.cached_name(id).is_some_and(|cached| cached != participant.name) {
                let checkpoint = graph.checkpoint(&[&participant.id]);
                graph.rename(id, &participant.name);
                if let Err(e) = self.store.save(graph.snapshot()) {
                    graph.restore(checkpoint);
                    warn!("Failed to persist new name for {}: {}", participant.id, e);
                    return Err(e);
                }
                debug!("Updated cached name for {}", participant.id);
            }
            graph.friends(id)
        };
        if !self.config.send_online_notification {
            return Ok(0);
        }
        let text = Notice::Online {
            who: participant.name.clone(),
        }
        .to_string();
        Ok(self.notify_connected(&friends, &text))
    }

    pub fn on_disconnected(&self, participant: &Participant) -> usize {
        if !self.config.send_offline_notification {
            return 0;
        }
        let friends = self.get_friends(&participant.id);
        let text = Notice::Offline {
            who: participant.name.clone(),
        }
        .to_string();
        self.notify_connected(&friends, &text)
    }

    /// Relay a chat line to connected friends (mutual only, when configured).
    pub fn friend_chat(&self, sender: &ParticipantId, message: &str) -> ChatOutcome {
        if !self.config.enable_friend_chat {
            return ChatOutcome::Disabled;
        }
        let message = message.trim();
        if message.is_empty() {
            return ChatOutcome::EmptyMessage;
        }
        let friends = self.get_friends(sender);
        if friends.is_empty() {
            return ChatOutcome::NoFriends;
        }
        let text = Notice::Chat {
            from: self.resolve_name(sender),
            text: message.to_string(),
        }
        .to_string();
        let mut delivered = 0;
        for friend_id in &friends {
            let Some(friend) = self.connected(friend_id) else {
                continue;
            };
            if self.config.limit_friend_chat_to_mutual_friends && !self.has_friend(&friend.id, sender) {
                continue;
            }
            self.sink.send(&friend.id, &text);
            delivered += 1;
        }
        ChatOutcome::Sent { delivered }
    }

    /// Write the current state regardless of whether anything changed.
    pub fn flush(&self) -> Result<(), FriendsError> {
        let graph = self.graph();
        self.store.save(graph.snapshot())?;
        info!("Friends flushed to {}", self.store.describe());
        Ok(())
    }

    pub fn close(self) -> Result<(), FriendsError> {
        self.flush()
    }

    fn connected(&self, id: &ParticipantId) -> Option<Participant> {
        self.directory.lookup(id).filter(|p| p.is_connected)
    }

    fn notify_connected(&self, recipients: &[ParticipantId], text: &str) -> usize {
        let mut sent = 0;
        for id in recipients {
            if self.connected(id).is_some() {
                self.sink.send(id, text);
                sent += 1;
            }
        }
        sent
    }
}
